use bevy::{
    color::palettes::css::GOLD,
    diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    prelude::*,
};

use crate::quakes::QuakeLayer;

pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        if cfg!(debug_assertions) {
            app.add_plugins(FrameTimeDiagnosticsPlugin::default())
                .add_systems(Startup, (debug_draw_fps, debug_draw_marker_count))
                .add_systems(Update, (text_update_fps, count_markers));
        }
    }
}

#[derive(Component)]
pub struct FpsText;

#[derive(Component)]
pub struct MarkerCountText;

fn debug_text(commands: &mut Commands, label: &str, top: f32, marker: impl Component) {
    commands
        .spawn((
            Text::new(label),
            TextFont {
                font_size: 16.0,
                ..default()
            },
            TextColor(Color::BLACK),
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(top),
                left: Val::Px(5.0),
                ..default()
            },
        ))
        .with_child((
            TextSpan::default(),
            (
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(GOLD.into()),
            ),
            marker,
        ));
}

pub fn debug_draw_fps(mut commands: Commands) {
    debug_text(&mut commands, "FPS: ", 5.0, FpsText);
}

pub fn debug_draw_marker_count(mut commands: Commands) {
    debug_text(&mut commands, "Markers: ", 25.0, MarkerCountText);
}

pub fn text_update_fps(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut TextSpan, With<FpsText>>,
) {
    for mut span in &mut query {
        if let Some(value) = diagnostics
            .get(&FrameTimeDiagnosticsPlugin::FPS)
            .and_then(|fps| fps.smoothed())
        {
            **span = format!("{value:.2}");
        }
    }
}

pub fn count_markers(
    layer: Res<QuakeLayer>,
    mut query: Query<&mut TextSpan, With<MarkerCountText>>,
) {
    if !layer.is_changed() {
        return;
    }
    for mut span in &mut query {
        **span = format!("{}", layer.marker_count());
    }
}
