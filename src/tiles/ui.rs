use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPreUpdateSet, egui};

use super::TileMapResources;

pub struct TilesUiPlugin;

impl Plugin for TilesUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, attribution_ui.after(EguiPreUpdateSet::InitContexts));
    }
}

/// Credits the active base layer in the bottom-left corner.
fn attribution_ui(res_manager: Res<TileMapResources>, mut contexts: EguiContexts) {
    let Some(layer) = res_manager.active_layer() else {
        return;
    };
    let ctx = contexts.ctx_mut();

    egui::Area::new("attribution".into())
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(5.0, -5.0))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_rgba_unmultiplied(255, 255, 255, 200))
                .corner_radius(4.0)
                .inner_margin(egui::Margin::symmetric(6, 2))
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(&layer.attribution)
                            .small()
                            .color(egui::Color32::from_gray(40)),
                    );
                });
        });
}
