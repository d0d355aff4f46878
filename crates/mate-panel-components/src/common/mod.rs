mod layer_window;
mod windows;

pub use layer_window::{ExclusiveZone, LayerConfig, LayerMargins, LayerShellBackend, LayerWindow};
pub use windows::WindowRegistry;
