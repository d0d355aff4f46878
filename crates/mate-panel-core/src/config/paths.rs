use std::path::PathBuf;

/// Configuration paths for the panel shell
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub panels_config: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));

        Self {
            panels_config: config_dir.join("mate-panel/panels.json"),
        }
    }

    /// Paths rooted at an explicit file, used by `--config`
    pub fn with_panels_config(path: impl Into<PathBuf>) -> Self {
        Self {
            panels_config: path.into(),
        }
    }

    /// Get the mate-panel config directory
    pub fn config_dir(&self) -> PathBuf {
        self.panels_config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new()
    }
}
