//! Runtime configuration.
//!
//! Everything has a compiled-in default. A `config.json` in the platform
//! config directory may override any subset of the fields.

use std::{fs, path::PathBuf};

use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Coord;

pub const EARTHQUAKE_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson";
pub const PLATE_FEED_URL: &str =
    "https://raw.githubusercontent.com/fraxen/tectonicplates/master/GeoJSON/PB2002_boundaries.json";
pub const STARTING_LOCATION: Coord = Coord::new(20.0, 0.0);
pub const STARTING_ZOOM: f32 = 2.5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseLayerConfig {
    pub name: String,
    /// Leaflet style template with `{s}`, `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    pub attribution: String,
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub earthquake_feed_url: String,
    pub plate_feed_url: String,
    pub starting_location: Coord,
    pub starting_zoom: f32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub base_layers: Vec<BaseLayerConfig>,
    /// Overrides the platform cache directory for downloaded tiles.
    pub tile_cache_dir: Option<PathBuf>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            earthquake_feed_url: EARTHQUAKE_FEED_URL.to_string(),
            plate_feed_url: PLATE_FEED_URL.to_string(),
            starting_location: STARTING_LOCATION,
            starting_zoom: STARTING_ZOOM,
            request_timeout_secs: 10,
            user_agent: concat!("quake-map/", env!("CARGO_PKG_VERSION")).to_string(),
            base_layers: vec![
                BaseLayerConfig {
                    name: "Basemap".to_string(),
                    url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                    attribution: "© OpenStreetMap contributors".to_string(),
                },
                BaseLayerConfig {
                    name: "Street Map".to_string(),
                    url_template: "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png"
                        .to_string(),
                    attribution: "© OpenStreetMap contributors, HOT".to_string(),
                },
            ],
            tile_cache_dir: None,
        }
    }
}

impl MapConfig {
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let mut config: MapConfig = serde_json::from_str(data)?;
        if config.base_layers.is_empty() {
            config.base_layers = MapConfig::default().base_layers;
        }
        Ok(config)
    }

    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&data)
    }

    /// Reads the user config if there is one, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        let Some(path) = project_dirs().map(|dirs| dirs.config_dir().join("config.json")) else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config overrides");
                config
            }
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn tile_cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.tile_cache_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.cache_dir().join("tiles"))
            .unwrap_or_else(|| PathBuf::from("cache"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "quake-map", "quake-map")
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(MapConfig::load_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_feeds() {
        let config = MapConfig::default();
        assert_eq!(config.earthquake_feed_url, EARTHQUAKE_FEED_URL);
        assert_eq!(config.plate_feed_url, PLATE_FEED_URL);
        assert_eq!(config.base_layers.len(), 2);
        assert_eq!(config.base_layers[0].name, "Basemap");
        assert_eq!(config.base_layers[1].name, "Street Map");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config =
            MapConfig::from_json(r#"{ "request_timeout_secs": 30, "base_layers": [] }"#).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.starting_location, STARTING_LOCATION);
        assert_eq!(config.base_layers.len(), 2);
    }

    #[test]
    fn starting_location_uses_lat_lon_keys() {
        let json = r#"{ "starting_location": { "lat": 51.5, "lon": -0.1 } }"#;
        let config = MapConfig::from_json(json).unwrap();
        assert_eq!(config.starting_location, Coord::new(51.5, -0.1));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(matches!(
            MapConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
