use bevy::prelude::*;
use bevy_pancam::{DirectionKeys, PanCam, PanCamPlugin};

use crate::{
    EguiBlockInputState,
    config::MapConfig,
    types::{MAX_TILE_ZOOM, WORLD_SIZE, scale_for_zoom},
};

pub struct CameraSystemPlugin;

impl Plugin for CameraSystemPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PanCamPlugin)
            .add_systems(Startup, setup_camera)
            .add_systems(Update, handle_pancam);
    }
}

fn setup_camera(mut commands: Commands, config: Res<MapConfig>) {
    let starting = config.starting_location.to_world();
    let half = WORLD_SIZE as f32 / 2.0;

    commands.spawn((
        Camera2d,
        Projection::from(OrthographicProjection {
            scale: scale_for_zoom(config.starting_zoom),
            ..OrthographicProjection::default_2d()
        }),
        Transform::from_translation(starting.extend(1.0)),
        PanCam {
            grab_buttons: vec![MouseButton::Left, MouseButton::Middle],
            move_keys: DirectionKeys {
                up: vec![KeyCode::ArrowUp],
                down: vec![KeyCode::ArrowDown],
                left: vec![KeyCode::ArrowLeft],
                right: vec![KeyCode::ArrowRight],
            },
            speed: 400.,
            enabled: true,
            zoom_to_cursor: true,
            min_scale: scale_for_zoom(MAX_TILE_ZOOM as f32),
            max_scale: scale_for_zoom(0.0),
            min_x: -half,
            max_x: half,
            min_y: -half,
            max_y: half,
        },
    ));
}

fn handle_pancam(mut query: Query<&mut PanCam>, state: Res<EguiBlockInputState>) {
    if state.is_changed() {
        for mut pancam in &mut query {
            pancam.enabled = !state.block_input;
        }
    }
}

/// World units per screen pixel.
pub fn camera_scale(projection: &Projection) -> f32 {
    match projection {
        Projection::Orthographic(ortho) => ortho.scale,
        _ => 1.0,
    }
}

/// The part of the world plane the camera currently shows.
pub fn camera_view_rect(window: &Window, transform: &Transform, scale: f32) -> Rect {
    let half = Vec2::new(window.width(), window.height()) * scale / 2.0;
    let centre = transform.translation.truncate();
    Rect::from_corners(centre - half, centre + half)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rect_grows_with_scale() {
        let window = Window {
            resolution: (800.0, 600.0).into(),
            ..Default::default()
        };
        let transform = Transform::from_xyz(100.0, -50.0, 1.0);
        let rect = camera_view_rect(&window, &transform, 2.0);
        assert_eq!(rect.min, Vec2::new(-700.0, -650.0));
        assert_eq!(rect.max, Vec2::new(900.0, 550.0));
    }

    #[test]
    fn only_orthographic_cameras_report_scale() {
        let ortho = Projection::from(OrthographicProjection {
            scale: 0.5,
            ..OrthographicProjection::default_2d()
        });
        assert_eq!(camera_scale(&ortho), 0.5);
        assert_eq!(camera_scale(&Projection::default()), 1.0);
    }
}
