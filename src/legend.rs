//! Depth legend in the bottom-right corner of the map.

use bevy::prelude::*;
use bevy_egui::{
    EguiContexts, EguiPreUpdateSet,
    egui::{self, Color32, RichText},
};

use crate::quakes::{OverlayVisibility, depth_color};

pub const LEGEND_THRESHOLDS: [i32; 6] = [-10, 10, 30, 50, 70, 90];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub lower: i32,
    /// `None` for the open-ended deepest bucket.
    pub upper: Option<i32>,
    pub color: &'static str,
}

impl LegendEntry {
    pub fn label(&self) -> String {
        match self.upper {
            Some(upper) => format!("{}–{}", self.lower, upper),
            None => format!("{}+", self.lower),
        }
    }
}

pub fn legend_entries() -> Vec<LegendEntry> {
    LEGEND_THRESHOLDS
        .iter()
        .enumerate()
        .map(|(i, &lower)| LegendEntry {
            lower,
            upper: LEGEND_THRESHOLDS.get(i + 1).copied(),
            // Any depth just past the lower bound lands in this bucket.
            color: depth_color(Some(lower as f64 + 1.0)),
        })
        .collect()
}

/// The legend as a static HTML fragment, one swatch per bucket.
pub fn legend_html() -> String {
    let mut html = String::new();
    for entry in legend_entries() {
        html.push_str(&format!(
            "<i style=\"background:{}; width: 20px; height: 20px; display: inline-block;\"></i> {}",
            entry.color, entry.lower
        ));
        match entry.upper {
            Some(upper) => html.push_str(&format!("&ndash;{}<br>", upper)),
            None => html.push('+'),
        }
    }
    html
}

pub struct LegendPlugin;

impl Plugin for LegendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, legend_ui.after(EguiPreUpdateSet::InitContexts));
    }
}

fn legend_ui(mut contexts: EguiContexts, overlays: Res<OverlayVisibility>) {
    if !overlays.legend {
        return;
    }
    let ctx = contexts.ctx_mut();

    egui::Area::new("legend".into())
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-10.0, -10.0))
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_rgba_premultiplied(255, 255, 255, 230))
                .corner_radius(5.0)
                .inner_margin(8.0)
                .shadow(egui::epaint::Shadow {
                    color: egui::Color32::from_black_alpha(60),
                    offset: [2, 2],
                    blur: 6,
                    spread: 1,
                })
                .show(ui, |ui| {
                    ui.label(RichText::new("Depth (km)").color(Color32::BLACK).strong());
                    for entry in legend_entries() {
                        ui.horizontal(|ui| {
                            let (rect, _) = ui
                                .allocate_exact_size(egui::vec2(20.0, 20.0), egui::Sense::hover());
                            ui.painter().rect_filled(rect, 0.0, swatch(entry.color));
                            ui.label(RichText::new(entry.label()).color(Color32::BLACK));
                        });
                    }
                });
        });
}

fn swatch(hex: &str) -> Color32 {
    Color32::from_hex(hex).unwrap_or(Color32::GRAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_buckets_in_order() {
        let entries = legend_entries();
        assert_eq!(entries.len(), 6);
        let lowers: Vec<i32> = entries.iter().map(|e| e.lower).collect();
        assert_eq!(lowers, vec![-10, 10, 30, 50, 70, 90]);
        assert_eq!(
            entries.iter().map(|e| e.color).collect::<Vec<_>>(),
            vec!["#ccff33", "#ffff33", "#ffcc33", "#ff9933", "#ff6633", "#ff3333"]
        );
    }

    #[test]
    fn only_the_last_bucket_is_open_ended() {
        let entries = legend_entries();
        assert!(entries[..5].iter().all(|e| e.upper.is_some()));
        assert_eq!(entries[5].upper, None);
        assert_eq!(entries[0].label(), "-10–10");
        assert_eq!(entries[5].label(), "90+");
    }

    #[test]
    fn html_fragment_pairs_swatches_with_ranges() {
        let html = legend_html();
        assert_eq!(html.matches("<i style=").count(), 6);
        assert!(html.starts_with("<i style=\"background:#ccff33;"));
        assert!(html.contains("</i> 30&ndash;50<br>"));
        assert!(html.ends_with("</i> 90+"));
    }
}
