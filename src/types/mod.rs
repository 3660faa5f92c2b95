mod quake_types;
mod tile;

pub use quake_types::*;
pub use tile::*;
