//! Marker styling for earthquakes and plate boundaries.

use bevy::color::{Alpha, Color, Srgba};

use crate::types::Quake;

/// Depth buckets from deepest to shallowest: (exclusive lower bound in km, colour).
pub const DEPTH_BUCKETS: [(f64, &str); 5] = [
    (90.0, "#ff3333"),
    (70.0, "#ff6633"),
    (50.0, "#ff9933"),
    (30.0, "#ffcc33"),
    (10.0, "#ffff33"),
];
/// Colour for depths of 10 km or less, negative depths included.
pub const SHALLOW_COLOR: &str = "#ccff33";
pub const MIN_RADIUS: f32 = 1.0;
pub const RADIUS_PER_MAGNITUDE: f32 = 4.0;

pub const PLATE_COLOR: &str = "orange";
pub const PLATE_WEIGHT: f32 = 2.0;

pub fn depth_color(depth_km: Option<f64>) -> &'static str {
    let Some(depth) = depth_km else {
        return SHALLOW_COLOR;
    };
    DEPTH_BUCKETS
        .iter()
        .find(|(bound, _)| depth > *bound)
        .map_or(SHALLOW_COLOR, |(_, color)| *color)
}

/// Screen radius of a marker. Zero, negative and missing magnitudes still get a visible dot.
pub fn magnitude_radius(magnitude: Option<f64>) -> f32 {
    match magnitude {
        Some(mag) if mag > 0.0 => mag as f32 * RADIUS_PER_MAGNITUDE,
        _ => MIN_RADIUS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub radius: f32,
    pub fill_color: &'static str,
    pub stroke_color: &'static str,
    pub weight: f32,
    pub opacity: f32,
    pub fill_opacity: f32,
}

impl MarkerStyle {
    pub fn fill(&self) -> Color {
        css_color(self.fill_color, self.fill_opacity)
    }

    pub fn stroke(&self) -> Color {
        css_color(self.stroke_color, self.opacity)
    }
}

pub fn marker_style(quake: &Quake) -> MarkerStyle {
    MarkerStyle {
        radius: magnitude_radius(quake.magnitude),
        fill_color: depth_color(quake.depth_km),
        stroke_color: "#000",
        weight: 0.5,
        opacity: 1.0,
        fill_opacity: 0.8,
    }
}

/// Parses `#rgb`/`#rrggbb` and the few named colours used on the map. Unknown input is magenta.
pub fn css_color(value: &str, alpha: f32) -> Color {
    let srgba = match value {
        "orange" => Srgba::rgb_u8(255, 165, 0),
        "black" => Srgba::BLACK,
        "white" => Srgba::WHITE,
        hex => Srgba::hex(hex).unwrap_or(Srgba::rgb(1.0, 0.0, 1.0)),
    };
    Color::from(srgba.with_alpha(alpha))
}
