pub mod common;
pub mod monitors;
pub mod panel;

pub use common::{LayerConfig, LayerShellBackend, LayerWindow, WindowRegistry};
pub use monitors::GdkMonitorSource;
pub use panel::{load_css, PanelDriver, PanelMenu, PanelWindow, SurfaceBackend};
