mod loader;
mod renderer;
mod shapes_plugin;

pub use loader::*;
pub use renderer::*;
pub use shapes_plugin::*;
