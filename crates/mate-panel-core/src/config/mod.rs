mod settings;
mod panels;
mod paths;

pub use settings::*;
pub use panels::{AnimationSpeed, Lockdown, PanelsConfig, ToplevelConfig};
pub use paths::ConfigPaths;
