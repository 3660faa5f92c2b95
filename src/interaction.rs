use bevy::{prelude::*, window::PrimaryWindow};
use bevy_egui::{EguiContexts, EguiPreUpdateSet, egui};

use crate::{
    EguiBlockInputState,
    camera::camera_scale,
    quakes::{OverlayVisibility, PopupContent, QuakeLayer, ReloadFeeds},
    tiles::TileMapResources,
    types::{Coord, WORLD_SIZE},
};

/// A press and release closer than this many pixels counts as a click rather than a drag.
const CLICK_TOLERANCE: f32 = 4.0;
/// Gap between the popup's tip and the marker edge, in pixels.
const POPUP_GAP: f32 = 6.0;

pub struct InteractionSystemPlugin;

impl Plugin for InteractionSystemPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SelectedQuake>()
            .init_resource::<CursorCoord>()
            .add_systems(
                Update,
                (handle_mouse, popup_ui.after(EguiPreUpdateSet::InitContexts)).chain(),
            )
            .add_systems(
                Update,
                (track_cursor, cursor_readout_ui.after(EguiPreUpdateSet::InitContexts)).chain(),
            );
    }
}

/// Geographic position under the cursor while it is over the map.
#[derive(Resource, Debug, Default, PartialEq)]
pub struct CursorCoord(pub Option<Coord>);

/// The quake whose popup is open.
#[derive(Resource, Debug, Default)]
pub struct SelectedQuake {
    pub selection: Option<Selection>,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub world_position: Vec2,
    /// Marker radius in screen pixels.
    pub radius: f32,
    pub content: PopupContent,
}

#[allow(clippy::too_many_arguments)]
fn handle_mouse(
    buttons: Res<ButtonInput<MouseButton>>,
    q_windows: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform, &Projection), With<Camera2d>>,
    layer: Res<QuakeLayer>,
    overlays: Res<OverlayVisibility>,
    block: Res<EguiBlockInputState>,
    mut reload: EventReader<ReloadFeeds>,
    mut pressed_at: Local<Option<Vec2>>,
    mut selected: ResMut<SelectedQuake>,
) {
    if !reload.is_empty() {
        reload.clear();
        selected.selection = None;
    }

    let (Ok(window), Ok((camera, camera_transform, projection))) =
        (q_windows.single(), camera.single())
    else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    if buttons.just_pressed(MouseButton::Left) {
        *pressed_at = (!block.block_input).then_some(cursor);
    }
    if !buttons.just_released(MouseButton::Left) {
        return;
    }
    let Some(start) = pressed_at.take() else {
        return;
    };
    if start.distance(cursor) > CLICK_TOLERANCE {
        return;
    }

    let Ok(world) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };
    let hit = overlays
        .earthquakes
        .then(|| layer.pick(world, camera_scale(projection)))
        .flatten();

    selected.selection = hit.and_then(|hit| {
        let quake = layer.quakes.get(hit.index)?;
        info!("Selected {:?} at {:?}", quake.id, world);
        Some(Selection {
            world_position: Vec2::from(hit.position),
            radius: hit.radius,
            content: PopupContent::for_quake(quake),
        })
    });
}

fn popup_ui(
    mut contexts: EguiContexts,
    mut selected: ResMut<SelectedQuake>,
    overlays: Res<OverlayVisibility>,
    camera: Query<(&Camera, &GlobalTransform), With<Camera2d>>,
) {
    if !overlays.earthquakes {
        return;
    }
    let Some(selection) = &selected.selection else {
        return;
    };
    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };
    let Ok(anchor) =
        camera.world_to_viewport(camera_transform, selection.world_position.extend(0.0))
    else {
        return;
    };

    let ctx = contexts.ctx_mut();
    let mut close = false;

    egui::Area::new("quake_popup".into())
        .pivot(egui::Align2::CENTER_BOTTOM)
        .fixed_pos(egui::pos2(anchor.x, anchor.y - selection.radius - POPUP_GAP))
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::WHITE)
                .corner_radius(8.0)
                .inner_margin(10.0)
                .shadow(egui::epaint::Shadow {
                    color: egui::Color32::from_black_alpha(60),
                    offset: [0, 3],
                    blur: 10,
                    spread: 0,
                })
                .show(ui, |ui| {
                    ui.set_max_width(280.0);
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(&selection.content.place)
                                .heading()
                                .strong()
                                .color(egui::Color32::from_gray(20)),
                        );
                        if ui.small_button("×").clicked() {
                            close = true;
                        }
                    });
                    ui.separator();
                    for line in selection.content.lines() {
                        ui.label(egui::RichText::new(line).color(egui::Color32::from_gray(40)));
                    }
                });
        });

    if close {
        selected.selection = None;
    }
}

fn track_cursor(
    q_windows: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<Camera2d>>,
    mut cursor: ResMut<CursorCoord>,
) {
    let half = WORLD_SIZE as f32 / 2.0;
    let coord = q_windows
        .single()
        .ok()
        .and_then(|window| window.cursor_position())
        .zip(camera.single().ok())
        .and_then(|(position, (camera, transform))| {
            camera.viewport_to_world_2d(transform, position).ok()
        })
        .filter(|world| world.x.abs() <= half && world.y.abs() <= half)
        .map(Coord::from_world);
    if cursor.0 != coord {
        cursor.0 = coord;
    }
}

/// Latitude, longitude and the tile under the cursor, e.g. `40.0000, 12.0000  tile 3/4/3`.
pub fn cursor_label(coord: &Coord, zoom: u32) -> String {
    let tile = coord.to_tile_coords(zoom);
    format!(
        "{:.4}, {:.4}  tile {}/{}/{}",
        coord.lat, coord.long, tile.zoom, tile.x, tile.y
    )
}

fn cursor_readout_ui(
    mut contexts: EguiContexts,
    cursor: Res<CursorCoord>,
    tile_map: Res<TileMapResources>,
) {
    let Some(coord) = &cursor.0 else {
        return;
    };
    let ctx = contexts.ctx_mut();

    egui::Area::new("cursor_readout".into())
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(5.0, -30.0))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_rgba_unmultiplied(255, 255, 255, 200))
                .corner_radius(4.0)
                .inner_margin(egui::Margin::symmetric(6, 2))
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(cursor_label(coord, tile_map.zoom))
                            .small()
                            .monospace()
                            .color(egui::Color32::from_gray(40)),
                    );
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_label_names_the_tile_under_the_cursor() {
        assert_eq!(
            cursor_label(&Coord::new(40.0, 12.0), 3),
            "40.0000, 12.0000  tile 3/4/3"
        );
        assert_eq!(
            cursor_label(&Coord::new(-33.8688, 151.2093), 0),
            "-33.8688, 151.2093  tile 0/0/0"
        );
    }
}
