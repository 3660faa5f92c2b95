use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use bevy::{
    asset::RenderAssetUsages,
    image::Image,
    log::debug,
    render::render_resource::{Extent3d, TextureDimension, TextureFormat},
};
use thiserror::Error;
use ureq::Agent;

use crate::types::Tile;

const SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

#[derive(Error, Debug)]
pub enum TileError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
    #[error("cache error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode tile: {0}")]
    Image(#[from] image::ImageError),
}

/// Fills in a Leaflet style `{s}/{z}/{x}/{y}` template.
pub fn tile_url(template: &str, tile: &Tile) -> String {
    let index = (tile.x as u64 + tile.y as u64) % SUBDOMAINS.len() as u64;
    let subdomain = SUBDOMAINS[index as usize];
    template
        .replace("{s}", subdomain)
        .replace("{z}", &tile.zoom.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}

/// Directory name for a tile source: host and path prefix without the subdomain or placeholders.
pub fn cache_key(template: &str) -> String {
    let without_scheme = template.split("://").last().unwrap_or(template);
    let prefix = without_scheme
        .split("/{z}")
        .next()
        .unwrap_or(without_scheme)
        .replace("{s}.", "");
    prefix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn cache_path(cache_dir: &Path, template: &str, tile: &Tile) -> PathBuf {
    cache_dir
        .join(cache_key(template))
        .join(tile.zoom.to_string())
        .join(tile.x.to_string())
        .join(format!("{}.png", tile.y))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Clone)]
pub struct TileFetcher {
    agent: Agent,
    user_agent: String,
    cache_dir: PathBuf,
}

impl TileFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str, cache_dir: PathBuf) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build();
        TileFetcher {
            agent: config.into(),
            user_agent: user_agent.to_string(),
            cache_dir,
        }
    }

    /// Raw image bytes, from the disk cache when possible.
    pub fn fetch_bytes(&self, template: &str, tile: &Tile) -> Result<Vec<u8>, TileError> {
        let cache_file = cache_path(&self.cache_dir, template, tile);
        if cache_file.exists() {
            return Ok(fs::read(&cache_file)?);
        }

        let url = tile_url(template, tile);
        debug!("Downloading tile {}", url);
        let bytes = self
            .agent
            .get(&url)
            .header("User-Agent", self.user_agent.as_str())
            .call()?
            .body_mut()
            .read_to_vec()?;

        if let Some(dir) = cache_file.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&cache_file, &bytes)?;
        Ok(bytes)
    }

    pub fn fetch(&self, template: &str, tile: &Tile) -> Result<DecodedTile, TileError> {
        decode_tile(&self.fetch_bytes(template, tile)?)
    }
}

pub fn decode_tile(bytes: &[u8]) -> Result<DecodedTile, TileError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    Ok(DecodedTile {
        width,
        height,
        rgba: image.into_raw(),
    })
}

pub fn tile_to_bevy_image(tile: DecodedTile) -> Image {
    Image::new(
        Extent3d {
            width: tile.width,
            height: tile.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        tile.rgba,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}
