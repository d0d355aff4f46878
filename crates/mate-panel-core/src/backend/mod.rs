//! Platform placement primitives
//!
//! The engine computes everything in desktop coordinates and hands the result
//! to exactly one backend, chosen at startup: edge struts on X11 or layer-shell
//! anchoring on compositors.

#[cfg(feature = "x11")]
mod x11;

#[cfg(feature = "x11")]
pub use x11::X11StrutBackend;

use std::cell::RefCell;
use std::rc::Rc;

use compact_str::CompactString;

use crate::error::Result;
use crate::geometry::{Orientation, PanelEdges, Rect};
use crate::struts::WmStrut;
use crate::toplevel::ToplevelId;

/// Final placement of one toplevel window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Desktop-absolute window rectangle
    pub geometry: Rect,
    /// Rectangle of the monitor the panel is on
    pub monitor: usize,
    pub monitor_geometry: Rect,
    pub orientation: Orientation,
    /// Frame sides that get a bevel
    pub edges: PanelEdges,
    pub mapped: bool,
    /// Reserved space to publish; `None` clears any previous hint
    pub strut: Option<WmStrut>,
}

/// Window-system side of the engine
pub trait PlacementBackend {
    fn name(&self) -> &'static str;

    /// Move, resize, map and publish the strut of a toplevel window
    fn apply_placement(&mut self, toplevel: ToplevelId, placement: &Placement) -> Result<()>;

    /// Forget a destroyed toplevel and clear anything published for it
    fn clear_placement(&mut self, toplevel: ToplevelId) -> Result<()>;

    /// Move the pointer, used by keyboard grabs
    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()>;

    /// Name of the running window manager, if it advertises one
    fn window_manager_name(&mut self) -> Result<Option<CompactString>> {
        Ok(None)
    }
}

/// Every call a [`RecordingBackend`] received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Apply(ToplevelId, Placement),
    Clear(ToplevelId),
    Warp(i32, i32),
}

/// Backend that applies nothing and records every call.
///
/// Clones share the same log, so a test can keep one handle and give the
/// other to the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    calls: Rc<RefCell<Vec<BackendCall>>>,
    wm_name: Option<CompactString>,
    fail_warps: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_manager(name: impl Into<CompactString>) -> Self {
        Self {
            wm_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Make every pointer warp fail, as on platforms without one
    pub fn failing_warps(mut self) -> Self {
        self.fail_warps = true;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Most recent placement applied to `toplevel`
    pub fn last_placement(&self, toplevel: ToplevelId) -> Option<Placement> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            BackendCall::Apply(id, placement) if *id == toplevel => Some(*placement),
            _ => None,
        })
    }

    pub fn warps(&self) -> Vec<(i32, i32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Warp(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }
}

impl PlacementBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn apply_placement(&mut self, toplevel: ToplevelId, placement: &Placement) -> Result<()> {
        self.calls.borrow_mut().push(BackendCall::Apply(toplevel, *placement));
        Ok(())
    }

    fn clear_placement(&mut self, toplevel: ToplevelId) -> Result<()> {
        self.calls.borrow_mut().push(BackendCall::Clear(toplevel));
        Ok(())
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.calls.borrow_mut().push(BackendCall::Warp(x, y));
        if self.fail_warps {
            return Err(crate::error::PanelError::Unsupported {
                backend: "recording",
                operation: "warp_pointer",
            });
        }
        Ok(())
    }

    fn window_manager_name(&mut self) -> Result<Option<CompactString>> {
        Ok(self.wm_name.clone())
    }
}
