use bevy::prelude::*;

use super::{MarkerAssets, scale_markers, spawn_plate_lines, spawn_quake_markers};

/// Turns loaded feeds into meshes on the map.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MarkerAssets>().add_systems(
            Update,
            (spawn_quake_markers, scale_markers, spawn_plate_lines).chain(),
        );
    }
}
