use bevy::prelude::*;
use bevy_egui::{
    EguiContexts, EguiPreUpdateSet,
    egui::{self, Color32, RichText},
};

use crate::{
    quakes::{FeedPipeline, FeedStage, OverlayVisibility, PlateLayer, QuakeLayer, ReloadFeeds},
    tiles::TileMapResources,
};

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, layer_control_ui.after(EguiPreUpdateSet::InitContexts));
    }
}

/// Base layer radio buttons, overlay toggles and feed status, top right.
#[allow(clippy::too_many_arguments)]
fn layer_control_ui(
    mut contexts: EguiContexts,
    mut tile_map: ResMut<TileMapResources>,
    mut overlays: ResMut<OverlayVisibility>,
    mut reload: EventWriter<ReloadFeeds>,
    pipeline: Res<FeedPipeline>,
    quakes: Res<QuakeLayer>,
    plates: Res<PlateLayer>,
) {
    let ctx = contexts.ctx_mut();
    let text_color = Color32::from_rgb(221, 221, 221);

    let active = tile_map.active_index();
    let mut chosen = active;
    let mut show_quakes = overlays.earthquakes;
    let mut show_plates = overlays.plates;
    let mut reload_clicked = false;

    egui::Area::new("layers".into())
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(Color32::from_rgba_premultiplied(30, 30, 30, 255))
                .corner_radius(10.0)
                .inner_margin(10.0)
                .shadow(egui::epaint::Shadow {
                    color: Color32::from_black_alpha(60),
                    offset: [5, 5],
                    blur: 10,
                    spread: 5,
                })
                .show(ui, |ui| {
                    ui.set_width(190.0);
                    ui.spacing_mut().item_spacing = egui::vec2(8.0, 6.0);

                    egui::CollapsingHeader::new(RichText::new("Layers").color(text_color))
                        .default_open(true)
                        .show(ui, |ui| {
                            for (index, layer) in tile_map.layers.iter().enumerate() {
                                ui.radio_value(
                                    &mut chosen,
                                    index,
                                    RichText::new(&layer.name).color(text_color),
                                );
                            }
                            ui.separator();
                            ui.checkbox(
                                &mut show_quakes,
                                RichText::new("Earthquakes").color(text_color),
                            );
                            ui.checkbox(
                                &mut show_plates,
                                RichText::new("Tectonic Plates").color(text_color),
                            );
                        });

                    ui.separator();
                    let status_color = match pipeline.stage() {
                        FeedStage::Failed { .. } => Color32::from_rgb(255, 110, 110),
                        _ => Color32::from_rgb(135, 135, 135),
                    };
                    ui.label(RichText::new(pipeline.status_text()).small().color(status_color));
                    let summaries = [
                        feed_summary(quakes.quakes.len(), quakes.skipped, "earthquakes"),
                        feed_summary(plates.plates.len(), plates.skipped, "plate boundaries"),
                    ];
                    for summary in summaries {
                        ui.label(RichText::new(summary).small().color(text_color));
                    }
                    if ui
                        .add_enabled(!pipeline.is_loading(), egui::Button::new("Reload feeds"))
                        .on_hover_text("Fetch the earthquake and plate feeds again")
                        .clicked()
                    {
                        reload_clicked = true;
                    }
                });
        });

    if chosen != active {
        tile_map.set_active_layer(chosen);
    }
    // Write back only on change.
    if show_quakes != overlays.earthquakes || show_plates != overlays.plates {
        overlays.earthquakes = show_quakes;
        overlays.plates = show_plates;
    }
    if reload_clicked {
        reload.write(ReloadFeeds);
    }
}

fn feed_summary(count: usize, skipped: usize, noun: &str) -> String {
    if skipped == 0 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {} ({} skipped)", count, noun, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_mentions_skipped_features_only_when_present() {
        assert_eq!(feed_summary(12, 0, "earthquakes"), "12 earthquakes");
        assert_eq!(
            feed_summary(52, 2, "plate boundaries"),
            "52 plate boundaries (2 skipped)"
        );
    }
}
