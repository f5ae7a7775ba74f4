use bevy::prelude::*;
use components::{HintsTextComponent, MessageTextComponent, ScoreTextComponent, TimeTextComponent};
use configuration::GameConfiguration;
use delivery::{DeliveryGame, Direction};
use delivery_plugin::{
    events::{
        ArrowsOpacityEvent, DeliveryMadeEvent, GameOverEvent, HintsShownEvent, PauseToggledEvent,
    },
    DeliveryPlugin,
};
use resources::MessageTimerResource;

pub mod configuration;
pub mod delivery;
mod delivery_plugin;

const FONT: &str = "RobotoMedium-Owv4.ttf";

pub struct MainPlugin;
impl Plugin for MainPlugin {
    fn build(&self, app: &mut App) {
        let configuration: GameConfiguration = include_str!("../config/default.cfg")
            .parse()
            .expect("Embedded configuration should be valid");

        let text_height = 30.;

        app.insert_resource(MessageTimerResource(Timer::from_seconds(1.5, false)))
            .add_startup_system(setup(text_height))
            .add_system(show_game_over_splash)
            .add_system(update_score)
            .add_system(update_remaining_time)
            .add_system(show_hints)
            .add_system(fade_hints)
            .add_system(show_messages)
            .add_plugin(DeliveryPlugin { configuration });
    }
}

fn show_game_over_splash(
    mut commands: Commands,
    mut game_over_event_reader: EventReader<GameOverEvent>,
    asset_server: Res<AssetServer>,
    hud_query: Query<Entity, Or<(With<ScoreTextComponent>, With<HintsTextComponent>)>>,
) {
    let event = match game_over_event_reader.iter().last() {
        None => return,
        Some(event) => event,
    };

    warn!("Game over after {} deliveries", event.deliveries);

    for entity in hud_query.iter() {
        commands.entity(entity).despawn();
    }

    spawn_game_over_screen(commands, asset_server, event);
}

fn update_score(
    mut delivery_made_event_reader: EventReader<DeliveryMadeEvent>,
    mut score_component_query: Query<&mut Text, With<ScoreTextComponent>>,
) {
    let score = match delivery_made_event_reader.iter().last() {
        None => return,
        Some(event) => event.score,
    };

    for mut score_text in score_component_query.iter_mut() {
        score_text.sections[0].value = format!("Score: {}", score);
    }
}

fn update_remaining_time(
    game: Res<DeliveryGame<Entity>>,
    mut time_component_query: Query<&mut Text, With<TimeTextComponent>>,
) {
    if !game.is_changed() {
        return;
    }

    let remaining_time = game.remaining_time().max(0.);
    for mut time_text in time_component_query.iter_mut() {
        time_text.sections[0].value = format!("Time: {:.1}", remaining_time);
    }
}

fn hint_arrow(direction: &Direction) -> &'static str {
    match direction.hint_code() {
        0 => "v",
        1 => "^",
        2 => "<",
        _ => ">",
    }
}

fn show_hints(
    mut hints_event_reader: EventReader<HintsShownEvent>,
    mut hints_component_query: Query<&mut Text, With<HintsTextComponent>>,
) {
    let route = match hints_event_reader.iter().last() {
        None => return,
        Some(event) => &event.route,
    };

    let arrows: Vec<_> = route.moves.iter().map(hint_arrow).collect();
    for mut hints_text in hints_component_query.iter_mut() {
        hints_text.sections[0].value = arrows.join("  ");
        hints_text.sections[0].style.color.set_a(1.);
    }
}

fn fade_hints(
    mut opacity_event_reader: EventReader<ArrowsOpacityEvent>,
    mut hints_component_query: Query<&mut Text, With<HintsTextComponent>>,
) {
    let opacity = match opacity_event_reader.iter().last() {
        None => return,
        Some(event) => event.opacity,
    };

    for mut hints_text in hints_component_query.iter_mut() {
        hints_text.sections[0].style.color.set_a(opacity);
    }
}

fn show_messages(
    time: Res<Time>,
    mut delivery_made_event_reader: EventReader<DeliveryMadeEvent>,
    mut pause_event_reader: EventReader<PauseToggledEvent>,
    mut message_timer: ResMut<MessageTimerResource>,
    mut message_component_query: Query<&mut Text, With<MessageTextComponent>>,
) {
    let mut message = None;

    if delivery_made_event_reader
        .iter()
        .fold(false, |awarded, event| awarded || event.score_awarded)
    {
        message_timer.0.reset();
        message = Some("Thanks for the delivery!");
    }

    if let Some(event) = pause_event_reader.iter().last() {
        message = Some(if event.paused { "Paused" } else { "" });
    }

    if message.is_none() && message_timer.0.tick(time.delta()).just_finished() {
        message = Some("");
    }

    let message = match message {
        None => return,
        Some(m) => m,
    };
    for mut message_text in message_component_query.iter_mut() {
        message_text.sections[0].value = message.to_string();
    }
}

fn setup(text_height: f32) -> impl Fn(Commands, Res<AssetServer>) {
    move |mut commands: Commands, asset_server: Res<AssetServer>| {
        let font = asset_server.load(FONT);

        // set up the camera
        let camera = Camera2dBundle::default();
        commands.spawn_bundle(camera);

        let distance_from_border_top = 5.;
        let distance_from_bottom = 5.;
        let font_size = text_height - distance_from_border_top - distance_from_bottom;

        let text_style = TextStyle {
            font,
            font_size,
            color: Color::WHITE,
        };

        let hud_text = |value: &str, left: Val, right: Val| {
            TextBundle::from_section(value, text_style.clone())
                .with_text_alignment(TextAlignment::TOP_LEFT)
                .with_style(Style {
                    align_self: AlignSelf::FlexEnd,
                    position_type: PositionType::Absolute,
                    position: UiRect {
                        top: Val::Px(distance_from_border_top),
                        left,
                        right,
                        ..default()
                    },
                    ..default()
                })
        };

        commands
            .spawn_bundle(hud_text("Score: 0", Val::Px(15.0), Val::Auto))
            .insert(ScoreTextComponent);
        commands
            .spawn_bundle(hud_text("Time: -", Val::Auto, Val::Px(15.0)))
            .insert(TimeTextComponent);
        commands
            .spawn_bundle(hud_text("", Val::Percent(40.0), Val::Auto))
            .insert(HintsTextComponent);

        commands
            .spawn_bundle(
                TextBundle::from_section("", text_style.clone())
                    .with_text_alignment(TextAlignment::CENTER)
                    .with_style(Style {
                        align_self: AlignSelf::FlexEnd,
                        position_type: PositionType::Absolute,
                        position: UiRect {
                            bottom: Val::Px(distance_from_bottom),
                            left: Val::Percent(35.0),
                            ..default()
                        },
                        ..default()
                    }),
            )
            .insert(MessageTextComponent);
    }
}

fn game_over_summary(event: &GameOverEvent) -> String {
    let deliveries = match event.deliveries {
        0 => "No deliveries made".to_string(),
        1 => "1 delivery made".to_string(),
        n => format!("{} deliveries made", n),
    };
    format!(
        "Out of time!\n{}\nLast round: {:.0} s\nScore: {}",
        deliveries, event.last_round_duration, event.score
    )
}

fn spawn_game_over_screen(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    event: &GameOverEvent,
) {
    let text_style = TextStyle {
        font: asset_server.load(FONT),
        font_size: 30.0,
        color: Color::WHITE,
    };

    // Dimmed full screen panel with the summary centered on it
    commands
        .spawn_bundle(NodeBundle {
            style: Style {
                size: Size::new(Val::Percent(100.0), Val::Percent(100.0)),
                position_type: PositionType::Absolute,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            color: Color::rgba(0.0, 0.0, 0.0, 0.8).into(),
            ..default()
        })
        .with_children(|parent| {
            parent
                .spawn_bundle(NodeBundle {
                    style: Style {
                        padding: UiRect::all(Val::Px(20.0)),
                        ..default()
                    },
                    color: Color::rgb(0.55, 0.35, 0.3).into(),
                    ..default()
                })
                .with_children(|parent| {
                    parent.spawn_bundle(
                        TextBundle::from_section(game_over_summary(event), text_style)
                            .with_text_alignment(TextAlignment::CENTER),
                    );
                });
        });
}

mod components {
    use bevy::prelude::Component;

    #[derive(Component)]
    pub struct ScoreTextComponent;

    #[derive(Component)]
    pub struct TimeTextComponent;

    #[derive(Component)]
    pub struct HintsTextComponent;

    #[derive(Component)]
    pub struct MessageTextComponent;
}

mod resources {
    use bevy::time::Timer;

    pub struct MessageTimerResource(pub Timer);
}
