mod tile_api;
mod tile_map;
mod ui;

pub use tile_api::*;
pub use tile_map::*;
pub use ui::*;
