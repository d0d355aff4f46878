use gtk4::prelude::*;

use mate_panel_core::{PanelError, Placement, PlacementBackend, Result, ToplevelId};

use crate::common::WindowRegistry;

use super::style::{edge_classes, ALL_EDGE_CLASSES};

const GTK_ONLY: &str = "gtk";

/// Applies the GTK side of a placement (size, visibility, frame edges)
/// before handing it to the platform backend that positions the window and
/// publishes its reserved space.
pub struct SurfaceBackend {
    inner: Option<Box<dyn PlacementBackend>>,
    windows: WindowRegistry,
}

impl SurfaceBackend {
    pub fn new(inner: Box<dyn PlacementBackend>, windows: WindowRegistry) -> Self {
        Self {
            inner: Some(inner),
            windows,
        }
    }

    /// No platform positioning at all; windows are sized and shown only
    pub fn gtk_only(windows: WindowRegistry) -> Self {
        Self { inner: None, windows }
    }
}

impl PlacementBackend for SurfaceBackend {
    fn name(&self) -> &'static str {
        self.inner.as_ref().map_or(GTK_ONLY, |inner| inner.name())
    }

    fn apply_placement(&mut self, toplevel: ToplevelId, placement: &Placement) -> Result<()> {
        if let Some(window) = self.windows.get(toplevel) {
            let g = placement.geometry;
            window.set_size_request(g.width.max(1), g.height.max(1));
            window.set_default_size(g.width.max(1), g.height.max(1));

            for class in ALL_EDGE_CLASSES {
                window.remove_css_class(class);
            }
            for class in edge_classes(placement.edges) {
                window.add_css_class(class);
            }

            if placement.orientation.is_horizontal() {
                window.remove_css_class("vertical");
            } else {
                window.add_css_class("vertical");
            }
        }

        // Layer surfaces take their anchors before the first map
        let result = match self.inner.as_mut() {
            Some(inner) => inner.apply_placement(toplevel, placement),
            None => Ok(()),
        };

        if let Some(window) = self.windows.get(toplevel) {
            if window.is_visible() != placement.mapped {
                window.set_visible(placement.mapped);
            }
        }
        result
    }

    fn clear_placement(&mut self, toplevel: ToplevelId) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.clear_placement(toplevel),
            None => Ok(()),
        }
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.warp_pointer(x, y),
            None => Err(PanelError::Unsupported {
                backend: GTK_ONLY,
                operation: "warp_pointer",
            }),
        }
    }

    fn window_manager_name(&mut self) -> Result<Option<compact_str::CompactString>> {
        match self.inner.as_mut() {
            Some(inner) => inner.window_manager_name(),
            None => Ok(None),
        }
    }
}
