use thiserror::Error;
use tracing::{debug, info, warn};

use crate::configuration::GameConfiguration;

use super::{
    common::{DeliveryTarget, Direction, GridPosition, PlayerNavState, Route},
    route::{route_length, RouteError, RouteGenerator},
    world::TriggerLookup,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Delivery target {0:?} is outside of the grid")]
    TargetOutOfGrid(DeliveryTarget),
    #[error("No delivery trigger registered for {0:?}")]
    MissingTrigger(DeliveryTarget),
    #[error(transparent)]
    NoRoute(#[from] RouteError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    GoForward,
    GoBack,
    TurnLeft,
    TurnRight,
}

/// Movement actions currently held down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub going_forward: bool,
    pub going_back: bool,
    pub turning_left: bool,
    pub turning_right: bool,
}

/// What the character should do this frame: distance along its forward
/// vector and yaw change in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementIntent {
    pub distance: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub remaining_time: f32,
    /// Set only on the frame the countdown runs out.
    pub lost: bool,
    pub arrows_opacity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome<T> {
    pub route: Route,
    pub target: DeliveryTarget,
    pub trigger: T,
    pub previous_trigger: Option<T>,
    pub score: u32,
    pub score_awarded: bool,
}

/// Facing to start the next route from, given the side just delivered to
/// and the character yaw in degrees (0 is grid forward, positive turns right).
pub fn start_facing(side: Direction, yaw: f32) -> Direction {
    if side.is_longitudinal() {
        if yaw < 0. {
            Direction::Left
        } else {
            Direction::Right
        }
    } else if yaw.abs() < 90. {
        Direction::Forward
    } else {
        Direction::Back
    }
}

pub fn animation_rate(speed: f32, max_speed: f32) -> f32 {
    if max_speed <= 0. {
        return 0.;
    }
    (speed / max_speed).clamp(0., 1.)
}

/// Opacity of the hint arrows at `t` in [0, 1] of their display time:
/// fully visible for the first half, then fading out.
pub fn arrows_opacity(t: f32) -> f32 {
    if t < 0.5 {
        1.
    } else {
        (1. - (t - 0.5) * 2.).max(0.)
    }
}

#[derive(Debug)]
pub struct DeliveryGame<T> {
    configuration: GameConfiguration,
    generator: RouteGenerator,
    target: DeliveryTarget,
    active_trigger: Option<T>,
    input: InputState,
    remaining_time: f32,
    previous_round_duration: f32,
    score: u32,
    deliveries: u32,
    time_stunned: Option<f32>,
    show_arrows_time: f32,
    time_since_show_arrows: f32,
    paused: bool,
    lost: bool,
    /// A delivery failed on the current overlap; wait for the character to leave.
    overlap_failed: bool,
    next_seed: u64,
}

impl<T: Copy + PartialEq> DeliveryGame<T> {
    pub fn new(configuration: GameConfiguration) -> Self {
        let center = configuration.grid_size / 2;
        let next_seed = configuration.seed.unwrap_or_else(|| fastrand::u64(..));

        Self {
            generator: RouteGenerator::new(configuration.grid_size),
            target: DeliveryTarget::new(GridPosition::new(center, center), Direction::Right),
            active_trigger: None,
            input: InputState::default(),
            remaining_time: 0.,
            previous_round_duration: configuration.initial_round_duration,
            score: 0,
            deliveries: 0,
            time_stunned: Some(0.),
            show_arrows_time: 0.,
            time_since_show_arrows: 0.,
            paused: false,
            lost: false,
            overlap_failed: false,
            next_seed,
            configuration,
        }
    }

    /// Random walks tried per delivery before searching every route.
    pub fn with_max_walks(mut self, max_walks: usize) -> Self {
        self.generator = self.generator.with_max_walks(max_walks);
        self
    }

    /// Picks the first delivery of the session.
    pub fn start<L>(&mut self, lookup: &L) -> Result<DeliveryOutcome<T>, DeliveryError>
    where
        L: TriggerLookup<Trigger = T>,
    {
        self.generate_next_delivery(Direction::Forward, true, lookup)
    }

    /// Completes the delivery if `overlapped` is the active trigger. After a
    /// failure nothing is retried until [`Self::on_overlap_ended`].
    pub fn on_overlap<L>(
        &mut self,
        overlapped: T,
        yaw: f32,
        lookup: &L,
    ) -> Result<Option<DeliveryOutcome<T>>, DeliveryError>
    where
        L: TriggerLookup<Trigger = T>,
    {
        if self.overlap_failed || self.active_trigger != Some(overlapped) {
            return Ok(None);
        }

        let result = self.on_delivery_made(yaw, lookup);
        self.overlap_failed = result.is_err();
        result.map(Some)
    }

    pub fn on_overlap_ended(&mut self) {
        self.overlap_failed = false;
    }

    pub fn is_overlap_failed(&self) -> bool {
        self.overlap_failed
    }

    pub fn on_delivery_made<L>(
        &mut self,
        yaw: f32,
        lookup: &L,
    ) -> Result<DeliveryOutcome<T>, DeliveryError>
    where
        L: TriggerLookup<Trigger = T>,
    {
        let facing = start_facing(self.target.side, yaw);
        info!("delivery made at {:?}, next route starts {}", self.target, facing);
        self.generate_next_delivery(facing, false, lookup)
    }

    /// Walks from the current target to a new one and starts the next round.
    /// On error the current target stays active and nothing changes.
    pub fn generate_next_delivery<L>(
        &mut self,
        start_facing: Direction,
        is_first_delivery: bool,
        lookup: &L,
    ) -> Result<DeliveryOutcome<T>, DeliveryError>
    where
        L: TriggerLookup<Trigger = T>,
    {
        let start = PlayerNavState::new(start_facing, self.target.side, self.target.position);
        let steps = route_length(
            self.previous_round_duration,
            self.configuration.route_budget,
        );

        let rng = fastrand::Rng::with_seed(self.next_seed);

        let walk = match self.generator.generate(start, steps, &rng) {
            Ok(walk) => walk,
            Err(error) => {
                warn!("{}, searching every route instead", error);
                self.generator.search(start, steps).map_err(|error| {
                    warn!("keeping {:?}: {}", self.target, error);
                    error
                })?
            }
        };

        let grid_size = self.configuration.grid_size;
        let across_the_street = DeliveryTarget::new(
            walk.end.position.offset(walk.end.side.unit_vector()),
            walk.end.side.opposite(),
        );
        let change_street_side = self.configuration.change_street_side
            && !walk.end.position.is_on_boundary(grid_size)
            && across_the_street.position != start.position
            && rng.bool();
        let target = if change_street_side {
            across_the_street
        } else {
            walk.end.target()
        };

        if !target.position.is_inside(grid_size) {
            return Err(DeliveryError::TargetOutOfGrid(target));
        }
        let trigger = lookup
            .trigger(&target)
            .ok_or(DeliveryError::MissingTrigger(target))?;

        debug!("next delivery {:?}", target);

        self.next_seed = rng.u64(..);
        self.target = target;
        let previous_trigger = self.active_trigger.replace(trigger);

        self.show_arrows_time = self.previous_round_duration / 2.;
        self.time_since_show_arrows = 0.;

        self.remaining_time = (self.previous_round_duration - 1.)
            .max(self.configuration.min_round_duration);
        self.previous_round_duration = self.remaining_time;

        if !is_first_delivery {
            self.score += self.configuration.delivery_points;
            self.deliveries += 1;
        }

        Ok(DeliveryOutcome {
            route: walk.route,
            target,
            trigger,
            previous_trigger,
            score: self.score,
            score_awarded: !is_first_delivery,
        })
    }

    pub fn tick(&mut self, delta: f32) -> TickReport {
        if self.paused || self.lost || self.active_trigger.is_none() {
            return TickReport {
                remaining_time: self.remaining_time,
                ..TickReport::default()
            };
        }

        self.remaining_time -= delta;
        let lost = self.remaining_time < 0.;
        if lost {
            info!("time is up with score {}", self.score);
            self.lost = true;
        }

        if let Some(time_stunned) = self.time_stunned.as_mut() {
            *time_stunned += delta;
            if *time_stunned >= self.configuration.stun_time {
                self.time_stunned = None;
            }
        }

        let mut opacity = None;
        if self.time_since_show_arrows < self.show_arrows_time {
            self.time_since_show_arrows += delta;
            let t = (self.time_since_show_arrows / self.show_arrows_time).min(1.);
            opacity = Some(arrows_opacity(t));
        }

        TickReport {
            remaining_time: self.remaining_time,
            lost,
            arrows_opacity: opacity,
        }
    }

    pub fn movement(&self, delta: f32) -> MovementIntent {
        if self.is_stunned() || self.paused || self.lost {
            return MovementIntent::default();
        }

        let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;
        MovementIntent {
            distance: axis(self.input.going_forward, self.input.going_back)
                * self.configuration.forward_speed
                * delta,
            yaw: axis(self.input.turning_right, self.input.turning_left)
                * self.configuration.turn_speed
                * delta,
        }
    }

    pub fn set_input(&mut self, action: InputAction, pressed: bool) {
        let flag = match action {
            InputAction::GoForward => &mut self.input.going_forward,
            InputAction::GoBack => &mut self.input.going_back,
            InputAction::TurnLeft => &mut self.input.turning_left,
            InputAction::TurnRight => &mut self.input.turning_right,
        };
        *flag = pressed;
    }

    pub fn on_stunned(&mut self) {
        self.time_stunned = Some(0.);
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_stunned(&self) -> bool {
        self.time_stunned.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn deliveries(&self) -> u32 {
        self.deliveries
    }

    pub fn remaining_time(&self) -> f32 {
        self.remaining_time
    }

    pub fn previous_round_duration(&self) -> f32 {
        self.previous_round_duration
    }

    pub fn target(&self) -> DeliveryTarget {
        self.target
    }

    pub fn active_trigger(&self) -> Option<T> {
        self.active_trigger
    }

    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn configuration(&self) -> &GameConfiguration {
        &self.configuration
    }
}
