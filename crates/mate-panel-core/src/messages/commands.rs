use crate::config::PanelsConfig;

/// Commands FROM GTK TO async services
#[derive(Debug, Clone)]
pub enum ShellCommand {
    /// Re-read panels.json now instead of waiting for a file event
    ReloadConfig,

    /// Persist the current layout (after a drag or a resize)
    SaveConfig(PanelsConfig),
}
