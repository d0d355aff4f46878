use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PanelError, Result};
use crate::geometry::Orientation;

use super::settings::{
    EngineSettings, DEFAULT_AUTO_HIDE_SIZE, DEFAULT_HIDE_DELAY, DEFAULT_SIZE, DEFAULT_UNHIDE_DELAY,
};

/// How fast hide/unhide animations run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationSpeed {
    Slow,
    Medium,
    #[default]
    Fast,
}

impl AnimationSpeed {
    pub fn duration(self) -> Duration {
        match self {
            AnimationSpeed::Slow => Duration::from_millis(2000),
            AnimationSpeed::Medium => Duration::from_millis(1200),
            AnimationSpeed::Fast => Duration::from_millis(400),
        }
    }
}

/// Which interactive changes the session allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockdown {
    #[serde(default)]
    pub locked_down: bool,
    #[serde(default = "default_true")]
    pub size_writable: bool,
    #[serde(default = "default_true")]
    pub position_writable: bool,
}

impl Default for Lockdown {
    fn default() -> Self {
        Self {
            locked_down: false,
            size_writable: true,
            position_writable: true,
        }
    }
}

impl Lockdown {
    pub fn can_move(&self) -> bool {
        !self.locked_down && self.position_writable
    }

    pub fn can_resize(&self) -> bool {
        !self.locked_down && self.size_writable
    }
}

/// One panel (or drawer) as persisted in panels.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToplevelConfig {
    pub id: CompactString,
    #[serde(default)]
    pub name: CompactString,

    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "default_size")]
    pub size: i32,
    #[serde(default)]
    pub monitor: usize,
    #[serde(default = "default_true")]
    pub expand: bool,

    #[serde(default)]
    pub x: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_right: Option<i32>,
    #[serde(default)]
    pub x_centered: bool,
    #[serde(default)]
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_bottom: Option<i32>,
    #[serde(default)]
    pub y_centered: bool,

    #[serde(default)]
    pub auto_hide: bool,
    #[serde(default = "default_hide_delay")]
    pub hide_delay: u32,
    #[serde(default = "default_unhide_delay")]
    pub unhide_delay: u32,
    #[serde(default = "default_auto_hide_size")]
    pub auto_hide_size: i32,
    #[serde(default = "default_true")]
    pub animate: bool,
    #[serde(default)]
    pub animation_speed: AnimationSpeed,
    #[serde(default)]
    pub enable_buttons: bool,
    #[serde(default = "default_true")]
    pub enable_arrows: bool,

    #[serde(default)]
    pub lockdown: Lockdown,

    /// Parent panel id when this entry is a drawer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_to: Option<CompactString>,
}

fn default_true() -> bool {
    true
}

fn default_size() -> i32 {
    DEFAULT_SIZE
}

fn default_hide_delay() -> u32 {
    DEFAULT_HIDE_DELAY
}

fn default_unhide_delay() -> u32 {
    DEFAULT_UNHIDE_DELAY
}

fn default_auto_hide_size() -> i32 {
    DEFAULT_AUTO_HIDE_SIZE
}

impl ToplevelConfig {
    /// A panel with every field at its default
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self {
            id: id.into(),
            name: CompactString::default(),
            orientation: Orientation::default(),
            size: DEFAULT_SIZE,
            monitor: 0,
            expand: true,
            x: 0,
            x_right: None,
            x_centered: false,
            y: 0,
            y_bottom: None,
            y_centered: false,
            auto_hide: false,
            hide_delay: DEFAULT_HIDE_DELAY,
            unhide_delay: DEFAULT_UNHIDE_DELAY,
            auto_hide_size: DEFAULT_AUTO_HIDE_SIZE,
            animate: true,
            animation_speed: AnimationSpeed::default(),
            enable_buttons: false,
            enable_arrows: true,
            lockdown: Lockdown::default(),
            attach_to: None,
        }
    }
}

/// Panel layout file (panels.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelsConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default = "default_toplevels")]
    pub toplevels: Vec<ToplevelConfig>,
}

/// A fresh session gets the classic two-panel layout
fn default_toplevels() -> Vec<ToplevelConfig> {
    let top = ToplevelConfig {
        name: "Top Panel".into(),
        ..ToplevelConfig::new("top")
    };
    let bottom = ToplevelConfig {
        name: "Bottom Panel".into(),
        orientation: Orientation::Bottom,
        ..ToplevelConfig::new("bottom")
    };
    vec![top, bottom]
}

impl Default for PanelsConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            toplevels: default_toplevels(),
        }
    }
}

impl PanelsConfig {
    /// Load, falling back to defaults when the file is missing or invalid
    pub fn load(path: &PathBuf) -> Self {
        std::fs::read(path)
            .ok()
            .and_then(|data| serde_json::from_slice(&data).ok())
            .unwrap_or_default()
    }

    /// Load and report why the file cannot be used
    pub fn load_checked(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| PanelError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&data).map_err(|source| PanelError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn save(&self, path: &PathBuf) -> anyhow::Result<()> {
        let dir = path.parent().ok_or_else(|| anyhow::anyhow!("Invalid path"))?;
        std::fs::create_dir_all(dir)?;
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn toplevel(&self, id: &str) -> Option<&ToplevelConfig> {
        self.toplevels.iter().find(|t| t.id == id)
    }

    /// Consistency problems that do not prevent parsing
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (i, toplevel) in self.toplevels.iter().enumerate() {
            if self.toplevels[..i].iter().any(|t| t.id == toplevel.id) {
                problems.push(format!("duplicate toplevel id '{}'", toplevel.id));
            }

            if toplevel.size <= 0 {
                problems.push(format!("toplevel '{}' has non-positive size {}", toplevel.id, toplevel.size));
            }

            if toplevel.x_right.is_some() && toplevel.x_centered {
                problems.push(format!("toplevel '{}' sets both x_right and x_centered", toplevel.id));
            }

            if toplevel.y_bottom.is_some() && toplevel.y_centered {
                problems.push(format!("toplevel '{}' sets both y_bottom and y_centered", toplevel.id));
            }

            if let Some(parent) = &toplevel.attach_to {
                if parent == &toplevel.id {
                    problems.push(format!("toplevel '{}' is attached to itself", toplevel.id));
                } else if self.toplevel(parent).is_none() {
                    problems.push(format!(
                        "toplevel '{}' is attached to unknown toplevel '{}'",
                        toplevel.id, parent
                    ));
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_entry_takes_defaults() {
        let config: PanelsConfig =
            serde_json::from_str(r#"{ "toplevels": [ { "id": "p", "orientation": "left" } ] }"#).unwrap();

        let panel = &config.toplevels[0];
        assert_eq!(panel.orientation, Orientation::Left);
        assert_eq!(panel.size, DEFAULT_SIZE);
        assert_eq!(panel.hide_delay, 300);
        assert_eq!(panel.unhide_delay, 100);
        assert_eq!(panel.auto_hide_size, 1);
        assert!(panel.expand);
        assert!(panel.lockdown.can_move());
        assert_eq!(config.engine.snap_tolerance, 48);
    }

    #[test]
    fn test_missing_toplevels_gives_default_layout() {
        let config: PanelsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.toplevels.len(), 2);
        assert_eq!(config.toplevels[1].orientation, Orientation::Bottom);
    }

    #[test]
    fn test_validate_reports_dangling_drawer() {
        let mut config = PanelsConfig::default();
        let mut drawer = ToplevelConfig::new("drawer");
        drawer.attach_to = Some("nowhere".into());
        config.toplevels.push(drawer);
        config.toplevels.push(ToplevelConfig::new("top"));

        let problems = config.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("unknown toplevel 'nowhere'")));
        assert!(problems.iter().any(|p| p.contains("duplicate")));
    }

    #[test]
    fn test_load_checked_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("mate-panel-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = PanelsConfig::load_checked(&path).unwrap_err();
        assert!(matches!(err, PanelError::ConfigParse { .. }));

        // The lenient loader falls back to defaults
        assert_eq!(PanelsConfig::load(&path), PanelsConfig::default());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_animation_durations() {
        assert_eq!(AnimationSpeed::Slow.duration(), Duration::from_millis(2000));
        assert_eq!(AnimationSpeed::Medium.duration(), Duration::from_millis(1200));
        assert_eq!(AnimationSpeed::Fast.duration(), Duration::from_millis(400));
    }
}
