//! Panel toplevel geometry and state engine
//!
//! A toplevel is one dockable panel window (or drawer). The [`PanelManager`]
//! owns every toplevel together with the monitor inventory and the strut
//! registry, and runs the geometry pass whenever something it depends on
//! changes.

mod animation;
mod attach;
mod grab;
mod manager;
mod position;
mod size;
mod state;
mod visibility;

use std::fmt;

use compact_str::{format_compact, CompactString};

pub use animation::get_delta;
pub use grab::{GrabKey, GrabOp, InputModifiers};
pub use manager::{ConfigApplied, PanelManager};
pub use size::{distribute_applet_hints, ContentRequest};
pub use state::{Toplevel, ToplevelState};

/// Stable handle of a toplevel inside its [`PanelManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToplevelId(pub u32);

impl ToplevelId {
    /// Never handed out by the manager
    pub const NONE: ToplevelId = ToplevelId(0);
}

impl fmt::Display for ToplevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Window title the glue gives the window of `id`, so that platform
/// backends can find it
pub fn window_title(id: ToplevelId) -> CompactString {
    format_compact!("mate-panel-{}", id.0)
}
