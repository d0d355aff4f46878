mod config_watcher;
mod hub;

pub use config_watcher::ConfigWatcher;
pub use hub::ServiceHub;
