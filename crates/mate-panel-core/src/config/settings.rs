use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Default panel thickness
pub const DEFAULT_SIZE: i32 = 24;
pub const DEFAULT_AUTO_HIDE_SIZE: i32 = 1;
pub const DEFAULT_HIDE_DELAY: u32 = 300;
pub const DEFAULT_UNHIDE_DELAY: u32 = 100;
/// Smallest length of a floating panel
pub const MINIMUM_WIDTH: i32 = 100;
/// A panel may be at most 1/5 of the monitor's short axis thick
pub const MAXIMUM_SIZE_SCREEN_RATIO: i32 = 5;
pub const HANDLE_SIZE: i32 = 10;
pub const DEFAULT_HIDE_BUTTON_SIZE: i32 = 10;
/// Animation step interval in milliseconds
pub const ANIMATION_TICK_MS: u64 = 20;
/// Pointer nudge per arrow key press during keyboard grabs
pub const KEYBOARD_NUDGE: i32 = 10;
pub const KEYBOARD_NUDGE_FINE: i32 = 1;

const DND_THRESHOLD: i32 = 8;
const SNAP_TOLERANCE_FACTOR: i32 = 6;

/// Process-wide engine settings (the `engine` block of panels.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Distance within which a dragged panel snaps to an edge or center
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: i32,

    /// Window managers that accept struts pivoted onto a perpendicular edge
    #[serde(default = "default_pivot_window_managers")]
    pub strut_pivot_window_managers: Vec<CompactString>,
}

fn default_snap_tolerance() -> i32 {
    DND_THRESHOLD * SNAP_TOLERANCE_FACTOR
}

fn default_pivot_window_managers() -> Vec<CompactString> {
    vec![CompactString::const_new("Marco")]
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: default_snap_tolerance(),
            strut_pivot_window_managers: default_pivot_window_managers(),
        }
    }
}

impl EngineSettings {
    /// Whether inner-edge struts get pivoted for this window manager
    pub fn pivot_enabled_for(&self, wm_name: Option<&str>) -> bool {
        wm_name.is_some_and(|name| {
            self.strut_pivot_window_managers
                .iter()
                .any(|wm| wm.as_str() == name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let settings: EngineSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.snap_tolerance, 48);
    }

    #[test]
    fn test_pivot_matches_exact_name() {
        let settings = EngineSettings::default();
        assert!(settings.pivot_enabled_for(Some("Marco")));
        assert!(!settings.pivot_enabled_for(Some("Metacity")));
        assert!(!settings.pivot_enabled_for(None));
    }
}
