mod backend;
mod driver;
mod menu;
mod style;
mod window;

pub use backend::SurfaceBackend;
pub use driver::PanelDriver;
pub use menu::PanelMenu;
pub use style::{edge_classes, load_css, PANEL_CSS};
pub use window::PanelWindow;
