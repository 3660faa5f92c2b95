use bevy::math::Vec2;
use rstar::{PointDistance, RTreeObject, AABB};

use super::Coord;

/// One earthquake from the USGS summary feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Quake {
    pub id: Option<String>,
    /// `properties.mag`; the feed sends `null` for some events.
    pub magnitude: Option<f64>,
    pub place: Option<String>,
    /// Epoch milliseconds.
    pub time_ms: Option<i64>,
    pub longitude: f64,
    pub latitude: f64,
    /// Third coordinate of the point, in km.
    pub depth_km: Option<f64>,
}

impl Quake {
    pub fn coord(&self) -> Coord {
        Coord::new(self.latitude, self.longitude)
    }
}

/// A plate boundary made of one or more polylines.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateBoundary {
    pub lines: geo::MultiLineString<f64>,
}

impl PlateBoundary {
    /// Polylines projected onto the world plane. Lines with fewer than two points are dropped.
    pub fn world_lines(&self) -> Vec<Vec<Vec2>> {
        self.lines
            .iter()
            .filter(|line| line.0.len() >= 2)
            .map(|line| {
                line.coords()
                    .map(|c| Coord::new(c.y, c.x).to_world())
                    .collect()
            })
            .collect()
    }
}

/// Spatial index entry for a spawned marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerHit {
    /// Position in `QuakeLayer::quakes`.
    pub index: usize,
    pub position: [f32; 2],
    /// Radius in screen pixels.
    pub radius: f32,
    /// Draw order; higher is on top.
    pub z: f32,
}

impl RTreeObject for MarkerHit {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for MarkerHit {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}
