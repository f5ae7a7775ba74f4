use bevy::{
    input::{keyboard::KeyboardInput, ButtonState},
    prelude::*,
};

use crate::{
    configuration::GameConfiguration,
    delivery::{
        animation_rate, DeliveryError, DeliveryGame, DeliveryOutcome, DeliveryTarget, Direction,
        GridLayout, GridPosition, InputAction, Registry,
    },
};

use self::{
    components::*,
    events::{
        ArrowsOpacityEvent, DeliveryMadeEvent, GameOverEvent, HintsShownEvent, PauseToggledEvent,
    },
};

pub type CityRegistry = Registry<Entity, Entity>;

// Buildings, barriers and triggers never overlap
const BUILDING_Z: f32 = 0.;
const TRIGGER_Z: f32 = 0.;
// The character rides over the triggers
const CHARACTER_Z: f32 = 1.;

/// Fraction of a cell covered by a building; the rest is street.
const BUILDING_FILL: f32 = 0.5;
const CHARACTER_RADIUS: f32 = 0.08;
const TRIGGER_RADIUS: f32 = 0.15;

pub struct DeliveryPlugin {
    pub configuration: GameConfiguration,
}

impl Plugin for DeliveryPlugin {
    fn build(&self, app: &mut App) {
        let layout = GridLayout::new(
            self.configuration.grid_size,
            self.configuration.building_size,
        );

        app.insert_resource(DeliveryGame::<Entity>::new(self.configuration.clone()))
            .insert_resource(layout)
            .init_resource::<CityRegistry>()
            .add_event::<DeliveryMadeEvent>()
            .add_event::<HintsShownEvent>()
            .add_event::<ArrowsOpacityEvent>()
            .add_event::<PauseToggledEvent>()
            .add_event::<GameOverEvent>()
            .add_startup_system(spawn_city)
            .add_startup_system(spawn_character)
            .add_startup_system_to_stage(StartupStage::PostStartup, start_session)
            .add_system(read_input.label("input"))
            .add_system(tick.label("tick").after("input"))
            .add_system(move_character.label("move").after("tick"))
            .add_system(detect_delivery.after("move"));
    }
}

/// Screen coordinates of a world position: the world runs transposed.
fn to_screen(world: Vec3, z: f32) -> Vec3 {
    Vec3::new(world.y, world.x, z)
}

fn to_world(screen: Vec3) -> Vec3 {
    Vec3::new(screen.y, screen.x, 0.)
}

fn spawn_city(mut commands: Commands, layout: Res<GridLayout>, mut registry: ResMut<CityRegistry>) {
    let cell_size = layout.cell_size;
    let building_size = cell_size * BUILDING_FILL;

    for position in layout.cells() {
        let building = commands
            .spawn_bundle(SpriteBundle {
                sprite: Sprite {
                    color: Color::rgb(0.55, 0.35, 0.3),
                    custom_size: Some(Vec2::new(building_size, building_size)),
                    ..default()
                },
                transform: Transform::from_translation(to_screen(
                    layout.world_position(position),
                    BUILDING_Z,
                )),
                ..default()
            })
            .insert(BuildingComponent)
            .id();
        registry.insert_building(position, building);

        // Every side gets a trigger, hidden until it is picked
        for side in Direction::ALL {
            let trigger = commands
                .spawn_bundle(SpriteBundle {
                    sprite: Sprite {
                        color: Color::rgb(1., 0.85, 0.1),
                        custom_size: Some(Vec2::splat(cell_size * TRIGGER_RADIUS)),
                        ..default()
                    },
                    transform: Transform::from_translation(to_screen(
                        layout.side_world_position(position, side),
                        TRIGGER_Z,
                    )),
                    visibility: Visibility { is_visible: false },
                    ..default()
                })
                .insert(DeliveryTriggerComponent)
                .id();
            registry.insert_trigger(DeliveryTarget::new(position, side), trigger);
        }
    }

    for (position, yaw) in layout.barriers() {
        let mut transform =
            Transform::from_translation(to_screen(layout.world_position(position), BUILDING_Z));
        transform.rotation = Quat::from_rotation_z(-yaw.to_radians());

        commands
            .spawn_bundle(SpriteBundle {
                sprite: Sprite {
                    color: Color::rgb(0.4, 0.4, 0.45),
                    custom_size: Some(Vec2::new(building_size, cell_size)),
                    ..default()
                },
                transform,
                ..default()
            })
            .insert(BarrierComponent);
    }

    info!("city of {} buildings spawned", layout.size * layout.size);
}

fn spawn_character(mut commands: Commands, layout: Res<GridLayout>) {
    // Starts on the street next to the central building
    let center = layout.size / 2;
    let start = layout.side_world_position(GridPosition::new(center, center), Direction::Back);
    let size = layout.cell_size * CHARACTER_RADIUS * 2.;

    commands
        .spawn_bundle(SpriteBundle {
            sprite: Sprite {
                color: Color::rgb(0.2, 0.6, 1.),
                custom_size: Some(Vec2::new(size, size * 1.6)),
                ..default()
            },
            transform: Transform::from_translation(to_screen(start, CHARACTER_Z)),
            ..default()
        })
        .insert(CharacterComponent::default());
}

fn start_session(
    mut commands: Commands,
    mut game: ResMut<DeliveryGame<Entity>>,
    registry: Res<CityRegistry>,
    mut hints_writer: EventWriter<HintsShownEvent>,
) {
    match game.start(&*registry) {
        Ok(outcome) => reveal(&mut commands, &outcome, &mut hints_writer),
        Err(error) => panic!("Cannot pick the first delivery: {}", error),
    }
}

fn read_input(
    mut keyboard_input_events: EventReader<KeyboardInput>,
    mut game: ResMut<DeliveryGame<Entity>>,
    mut pause_writer: EventWriter<PauseToggledEvent>,
) {
    for event in keyboard_input_events.iter() {
        let key_code = match event.key_code {
            None => continue,
            Some(kc) => kc,
        };
        let pressed = event.state == ButtonState::Pressed;

        let action = match key_code {
            KeyCode::Up | KeyCode::W => InputAction::GoForward,
            KeyCode::Down | KeyCode::S => InputAction::GoBack,
            KeyCode::Left | KeyCode::A => InputAction::TurnLeft,
            KeyCode::Right | KeyCode::D => InputAction::TurnRight,
            KeyCode::Escape | KeyCode::P => {
                if pressed {
                    let paused = game.toggle_pause();
                    pause_writer.send(PauseToggledEvent { paused });
                }
                continue;
            }
            _ => continue,
        };

        game.set_input(action, pressed);
    }
}

fn tick(
    time: Res<Time>,
    mut game: ResMut<DeliveryGame<Entity>>,
    mut game_over_writer: EventWriter<GameOverEvent>,
    mut opacity_writer: EventWriter<ArrowsOpacityEvent>,
) {
    let report = game.tick(time.delta_seconds());

    if let Some(opacity) = report.arrows_opacity {
        opacity_writer.send(ArrowsOpacityEvent { opacity });
    }

    if report.lost {
        warn!("Out of time!");
        game_over_writer.send(GameOverEvent {
            score: game.score(),
            deliveries: game.deliveries(),
            last_round_duration: game.previous_round_duration(),
        });
    }
}

fn move_character(
    time: Res<Time>,
    layout: Res<GridLayout>,
    mut game: ResMut<DeliveryGame<Entity>>,
    mut character_query: Query<(&mut Transform, &mut CharacterComponent)>,
) {
    let delta = time.delta_seconds();
    let intent = game.movement(delta);
    let max_speed = game.configuration().forward_speed;

    for (mut transform, mut character) in character_query.iter_mut() {
        character.yaw = normalize_yaw(character.yaw + intent.yaw);
        transform.rotation = Quat::from_rotation_z(-character.yaw.to_radians());

        let (sin, cos) = character.yaw.to_radians().sin_cos();
        let heading = Vec3::new(sin, cos, 0.);
        let destination = transform.translation + heading * intent.distance;

        character.speed = 0.;
        if intent.distance != 0. {
            if collides(&layout, to_world(destination)) {
                debug!("bumped into something at {:?}", destination);
                game.on_stunned();
            } else {
                transform.translation = destination;
                if delta > 0. {
                    character.speed = intent.distance.abs() / delta;
                }
            }
        }
        character.animation_rate = animation_rate(character.speed, max_speed);
    }
}

fn detect_delivery(
    mut commands: Commands,
    mut game: ResMut<DeliveryGame<Entity>>,
    layout: Res<GridLayout>,
    registry: Res<CityRegistry>,
    character_query: Query<(&Transform, &CharacterComponent)>,
    trigger_query: Query<&Transform, With<DeliveryTriggerComponent>>,
    mut delivery_writer: EventWriter<DeliveryMadeEvent>,
    mut hints_writer: EventWriter<HintsShownEvent>,
) {
    let trigger = match game.active_trigger() {
        None => return,
        Some(t) => t,
    };
    let trigger_position = match trigger_query.get(trigger) {
        Ok(transform) => transform.translation.truncate(),
        Err(_) => return,
    };

    for (transform, character) in character_query.iter() {
        let distance = transform.translation.truncate().distance(trigger_position);
        if distance > layout.cell_size * TRIGGER_RADIUS {
            if game.is_overlap_failed() {
                game.on_overlap_ended();
            }
            continue;
        }

        match game.on_overlap(trigger, character.yaw, &*registry) {
            Ok(Some(outcome)) => {
                delivery_writer.send(DeliveryMadeEvent {
                    score: outcome.score,
                    score_awarded: outcome.score_awarded,
                });
                reveal(&mut commands, &outcome, &mut hints_writer);
            }
            Ok(None) => {}
            Err(DeliveryError::NoRoute(error)) => {
                warn!("Next delivery unchanged: {}", error);
            }
            Err(error) => panic!("Delivery bookkeeping is out of sync: {}", error),
        }
        return;
    }
}

fn reveal(
    commands: &mut Commands,
    outcome: &DeliveryOutcome<Entity>,
    hints_writer: &mut EventWriter<HintsShownEvent>,
) {
    if let Some(previous) = outcome.previous_trigger {
        commands
            .entity(previous)
            .insert(Visibility { is_visible: false });
    }
    commands
        .entity(outcome.trigger)
        .insert(Visibility { is_visible: true });

    info!(
        "next delivery at {} on side {}",
        outcome.target.position, outcome.target.side
    );

    hints_writer.send(HintsShownEvent {
        route: outcome.route.clone(),
    });
}

/// Whether a point, in world coordinates, lies inside a building or past
/// the barriers.
fn collides(layout: &GridLayout, world: Vec3) -> bool {
    let half = (layout.size / 2) as f32;
    // Continuous grid coordinates, undoing the transposition
    let gx = world.y / layout.cell_size + half;
    let gy = world.x / layout.cell_size + half;

    let wall = -1. + BUILDING_FILL / 2. + CHARACTER_RADIUS;
    let far_wall = layout.size as f32 - wall - 1.;
    if gx < wall || gy < wall || gx > far_wall || gy > far_wall {
        return true;
    }

    let cell = layout.grid_position(world);
    if !cell.is_inside(layout.size) {
        return false;
    }

    let reach = BUILDING_FILL / 2. + CHARACTER_RADIUS;
    (gx - cell.x as f32).abs() < reach && (gy - cell.y as f32).abs() < reach
}

fn normalize_yaw(yaw: f32) -> f32 {
    let yaw = yaw.rem_euclid(360.);
    if yaw > 180. {
        yaw - 360.
    } else {
        yaw
    }
}

pub mod events {
    use crate::delivery::Route;

    pub struct DeliveryMadeEvent {
        pub score: u32,
        pub score_awarded: bool,
    }

    pub struct HintsShownEvent {
        pub route: Route,
    }

    pub struct ArrowsOpacityEvent {
        pub opacity: f32,
    }

    pub struct PauseToggledEvent {
        pub paused: bool,
    }

    pub struct GameOverEvent {
        pub score: u32,
        pub deliveries: u32,
        /// Seconds the player had for the round that ran out.
        pub last_round_duration: f32,
    }
}

mod components {
    use bevy::prelude::Component;

    #[derive(Component, Default)]
    pub struct CharacterComponent {
        /// Degrees, 0 along grid forward, positive to the right.
        pub yaw: f32,
        pub speed: f32,
        pub animation_rate: f32,
    }

    #[derive(Component)]
    pub struct BuildingComponent;

    #[derive(Component)]
    pub struct DeliveryTriggerComponent;

    #[derive(Component)]
    pub struct BarrierComponent;
}

#[cfg(test)]
mod tests {
    use bevy::{core::CorePlugin, input::InputPlugin, prelude::*, time::TimePlugin};

    use crate::{
        configuration::GameConfiguration,
        delivery::{DeliveryGame, GridLayout},
    };

    use super::{
        collides, components::CharacterComponent, normalize_yaw, to_world, CityRegistry,
        DeliveryPlugin,
    };

    #[test]
    fn test_delivery_e2e() {
        let mut app = create_app();
        app.update();

        let (first_trigger, score) = {
            let game = app.world.resource::<DeliveryGame<Entity>>();
            (game.active_trigger().unwrap(), game.score())
        };
        assert_eq!(score, 0);
        assert!(app.world.get::<Visibility>(first_trigger).unwrap().is_visible);

        // Ride onto the trigger
        let trigger_translation = app.world.get::<Transform>(first_trigger).unwrap().translation;
        place_character(&mut app, trigger_translation);

        app.update();

        let game = app.world.resource::<DeliveryGame<Entity>>();
        assert_eq!(game.score(), 100);
        let next_trigger = game.active_trigger().unwrap();
        assert_ne!(next_trigger, first_trigger);
        assert!(!app.world.get::<Visibility>(first_trigger).unwrap().is_visible);
        assert!(app.world.get::<Visibility>(next_trigger).unwrap().is_visible);
    }

    #[test]
    fn test_failed_delivery_retried_after_leaving_the_trigger() {
        let mut app = create_app();
        app.update();

        let trigger = {
            let mut game = app.world.resource_mut::<DeliveryGame<Entity>>();
            let trigger = game.active_trigger().unwrap();
            // An empty city resolves no trigger at all
            assert!(game
                .on_overlap(trigger, 0., &CityRegistry::default())
                .is_err());
            trigger
        };
        let trigger_translation = app.world.get::<Transform>(trigger).unwrap().translation;

        place_character(&mut app, trigger_translation);
        app.update();
        assert_eq!(app.world.resource::<DeliveryGame<Entity>>().score(), 0);

        place_character(&mut app, trigger_translation + Vec3::new(50., 50., 0.));
        app.update();
        assert!(!app
            .world
            .resource::<DeliveryGame<Entity>>()
            .is_overlap_failed());

        place_character(&mut app, trigger_translation);
        app.update();
        assert_eq!(app.world.resource::<DeliveryGame<Entity>>().score(), 100);
    }

    #[test]
    fn test_collisions() {
        let layout = GridLayout::new(6, 100.);

        // Street between two buildings
        assert!(!collides(&layout, to_world(Vec3::new(-250., -300., 0.))));
        // Building center
        assert!(collides(&layout, to_world(Vec3::new(-300., -300., 0.))));
        // Outer street, then the barrier
        assert!(!collides(&layout, to_world(Vec3::new(-365., 0., 0.))));
        assert!(collides(&layout, to_world(Vec3::new(-390., 0., 0.))));
    }

    #[test]
    fn test_normalize_yaw() {
        assert_eq!(normalize_yaw(190.), -170.);
        assert_eq!(normalize_yaw(-190.), 170.);
        assert_eq!(normalize_yaw(90.), 90.);
    }

    fn place_character(app: &mut App, translation: Vec3) {
        let character = app
            .world
            .query_filtered::<Entity, With<CharacterComponent>>()
            .iter(&app.world)
            .next()
            .unwrap();
        app.world
            .get_mut::<Transform>(character)
            .unwrap()
            .translation = translation;
    }

    fn create_app() -> App {
        use tracing_log::LogTracer;
        use tracing_subscriber::{prelude::*, registry::Registry, EnvFilter};

        if LogTracer::init().is_ok() {
            let filter_layer = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("OFF,remembike=INFO"))
                .unwrap();
            let subscriber = Registry::default().with(filter_layer);
            let fmt_layer = tracing_subscriber::fmt::Layer::default();
            let subscriber = subscriber.with(fmt_layer);
            bevy::utils::tracing::subscriber::set_global_default(subscriber).unwrap();
        }

        let mut app = App::new();
        app.add_plugin(CorePlugin::default());
        app.add_plugin(TimePlugin::default());
        app.add_plugin(InputPlugin::default());
        app.add_plugin(DeliveryPlugin {
            configuration: GameConfiguration {
                seed: Some(11),
                ..GameConfiguration::default()
            },
        });

        app
    }
}
