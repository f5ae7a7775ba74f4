mod common;
mod game;
mod route;
mod world;

pub use common::{DeliveryTarget, Direction, GridPosition, PlayerNavState, Route};
pub use game::{
    animation_rate, arrows_opacity, start_facing, DeliveryError, DeliveryGame, DeliveryOutcome,
    InputAction, InputState, MovementIntent, TickReport,
};
pub use route::{
    route_length, RouteError, RouteGenerator, Walk, MAX_STEP_DRAWS, MAX_WALKS, MIN_ROUTE_LENGTH,
};
pub use world::{GridLayout, Registry, TriggerLookup, SIDE_OFFSET};
