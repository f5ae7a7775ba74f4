use bevy::prelude::*;

use remembike::{self, MainPlugin};

fn main() {
    App::new()
        .insert_resource(WindowDescriptor {
            title: "Remembike".to_string(),
            width: 800.,
            height: 860.,
            resizable: false,
            ..default()
        })
        .add_plugins(DefaultPlugins)
        .add_plugin(MainPlugin)
        .run();
}
