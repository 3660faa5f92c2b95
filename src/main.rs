use bevy::{
    prelude::*,
    winit::{UpdateMode, WinitSettings},
};
use bevy_egui::EguiPlugin;

use camera::CameraSystemPlugin;
use config::ConfigPlugin;
use debug::DebugPlugin;
use geojson::RenderPlugin;
use interaction::InteractionSystemPlugin;
use legend::LegendPlugin;
use quakes::QuakePlugin;
use settings::SettingsPlugin;
use tiles::TileMapPlugin;

pub mod camera;
pub mod config;
pub mod debug;
pub mod geojson;
pub mod interaction;
pub mod legend;
pub mod quakes;
pub mod settings;
pub mod tiles;
pub mod types;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Earthquake Map".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }))
        // Everything below reads MapConfig while building.
        .add_plugins(ConfigPlugin)
        .add_plugins(DebugPlugin)
        .add_plugins(EguiPlugin {
            enable_multipass_for_primary_context: false,
        })
        .insert_resource(EguiBlockInputState::default())
        .add_plugins((CameraSystemPlugin, TileMapPlugin, InteractionSystemPlugin))
        .insert_resource(WinitSettings {
            unfocused_mode: UpdateMode::Reactive {
                wait: std::time::Duration::from_secs(1),
                react_to_device_events: true,
                react_to_user_events: true,
                react_to_window_events: true,
            },
            ..Default::default()
        })
        .insert_resource(ClearColor(Color::from(Srgba {
            red: 0.9,
            green: 0.9,
            blue: 0.8,
            alpha: 1.0,
        })))
        .add_plugins(QuakePlugin)
        .add_plugins(RenderPlugin)
        .add_plugins(SettingsPlugin)
        .add_plugins(LegendPlugin)
        .add_systems(Update, absorb_egui_inputs)
        .run();
}

/// Set while the pointer is over an egui window so the map ignores it.
#[derive(Resource, Default)]
pub struct EguiBlockInputState {
    pub block_input: bool,
}

fn absorb_egui_inputs(
    mut contexts: bevy_egui::EguiContexts,
    mut state: ResMut<EguiBlockInputState>,
) {
    let ctx = contexts.ctx_mut();
    let block_input = ctx.wants_pointer_input() || ctx.is_pointer_over_area();
    if state.block_input != block_input {
        state.block_input = block_input;
    }
}
