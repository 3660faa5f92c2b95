use bevy::math::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Tile zoom at which one world unit equals one screen pixel.
pub const BASE_ZOOM: u32 = 3;
/// Width and height of the Web Mercator square in world units.
pub const WORLD_SIZE: f64 = 256.0 * (1 << BASE_ZOOM) as f64;
/// Past this f32 world coordinates start to jitter.
pub const MAX_TILE_ZOOM: u32 = 16;
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, Copy)]
#[serde(rename_all = "camelCase")]
pub struct Coord {
    pub lat: f64,
    #[serde(rename = "lon")]
    pub long: f64,
}

impl Coord {
    pub const fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Projects onto the world plane. The origin sits at (0°, 0°) and y grows northwards.
    pub fn to_world(&self) -> Vec2 {
        let lat = self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = self.long / 360.0 * WORLD_SIZE;
        let y = (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI) * WORLD_SIZE;
        Vec2::new(x as f32, y as f32)
    }

    pub fn from_world(point: Vec2) -> Self {
        let long = point.x as f64 / WORLD_SIZE * 360.0;
        let y = point.y as f64 / WORLD_SIZE * 2.0 * PI;
        let lat = (2.0 * y.exp().atan() - PI / 2.0).to_degrees();
        Coord::new(lat, normalize_longitude(long))
    }

    pub fn to_tile_coords(&self, zoom: u32) -> Tile {
        let n = 2_f64.powi(zoom as i32);
        let lat = self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = ((self.long + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();
        Tile::new(
            (x as i64).clamp(0, n as i64 - 1) as u32,
            (y as i64).clamp(0, n as i64 - 1) as u32,
            zoom,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub zoom: u32,
}

impl Tile {
    pub const fn new(x: u32, y: u32, zoom: u32) -> Self {
        Self { x, y, zoom }
    }

    /// Latitude and longitude of the north-west corner.
    #[cfg(test)]
    pub fn to_lat_long(&self) -> Coord {
        let n = 2.0f64.powi(self.zoom as i32);
        let lon_deg = self.x as f64 / n * 360.0 - 180.0;
        let lat_deg = (PI * (1.0 - 2.0 * self.y as f64 / n))
            .sinh()
            .atan()
            .to_degrees();
        Coord::new(lat_deg, lon_deg)
    }

    /// The square this tile covers on the world plane.
    pub fn world_rect(&self) -> Rect {
        let size = tile_world_size(self.zoom);
        let half = WORLD_SIZE as f32 / 2.0;
        let min_x = self.x as f32 * size - half;
        let max_y = half - self.y as f32 * size;
        Rect::new(min_x, max_y - size, min_x + size, max_y)
    }
}

pub fn tile_world_size(zoom: u32) -> f32 {
    (WORLD_SIZE / 2_f64.powi(zoom as i32)) as f32
}

/// Picks the tile zoom whose tiles are closest to 256 screen pixels wide.
pub fn tile_zoom_for_scale(scale: f32) -> u32 {
    if !scale.is_finite() || scale <= 0.0 {
        return BASE_ZOOM;
    }
    let zoom = (BASE_ZOOM as f32 - scale.log2()).round();
    zoom.clamp(0.0, MAX_TILE_ZOOM as f32) as u32
}

/// Camera scale that shows the map at a fractional web-map zoom level.
pub fn scale_for_zoom(zoom: f32) -> f32 {
    2_f32.powf(BASE_ZOOM as f32 - zoom)
}

/// Every tile at `zoom` intersecting `view`, grown by `margin` tiles on each side.
pub fn tiles_in_view(view: Rect, zoom: u32, margin: u32) -> Vec<Tile> {
    let n = 1_i64 << zoom;
    let size = tile_world_size(zoom) as f64;
    let half = WORLD_SIZE / 2.0;
    let to_index = |v: f64| (v / size).floor() as i64;

    let min_x = (to_index(view.min.x as f64 + half) - margin as i64).max(0);
    let max_x = (to_index(view.max.x as f64 + half) + margin as i64).min(n - 1);
    let min_y = (to_index(half - view.max.y as f64) - margin as i64).max(0);
    let max_y = (to_index(half - view.min.y as f64) + margin as i64).min(n - 1);

    let mut tiles = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            tiles.push(Tile::new(x as u32, y as u32, zoom));
        }
    }
    tiles
}

fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}
