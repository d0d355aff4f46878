use gtk4::gdk;
use gtk4::prelude::*;
use gtk4::Window;
use gtk4_layer_shell::{Edge, KeyboardMode, Layer, LayerShell};
use tracing::debug;

use mate_panel_core::{Orientation, PanelError, Placement, PlacementBackend, Rect, ToplevelId};

use super::WindowRegistry;

const BACKEND: &str = "layer-shell";

/// Layer shell surface configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    /// Layer to place the window on
    pub layer: Layer,
    /// Edges to anchor to
    pub anchors: Vec<Edge>,
    /// Exclusive zone (auto, none, or specific size)
    pub exclusive_zone: ExclusiveZone,
    pub keyboard_mode: KeyboardMode,
    /// Margins from the anchored edges
    pub margins: LayerMargins,
    /// Namespace for the surface
    pub namespace: String,
}

/// Exclusive zone configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusiveZone {
    /// Auto-calculate based on window size
    Auto,
    /// No exclusive zone
    None,
    /// Fixed size in pixels
    Fixed(i32),
}

/// Margins for layer shell window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerMargins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            layer: Layer::Top,
            anchors: vec![],
            exclusive_zone: ExclusiveZone::None,
            keyboard_mode: KeyboardMode::OnDemand,
            margins: LayerMargins::default(),
            namespace: "mate-panel".to_string(),
        }
    }
}

fn edge(orientation: Orientation) -> Edge {
    match orientation {
        Orientation::Top => Edge::Top,
        Orientation::Right => Edge::Right,
        Orientation::Bottom => Edge::Bottom,
        Orientation::Left => Edge::Left,
    }
}

impl LayerConfig {
    /// Surface configuration reproducing a computed placement.
    ///
    /// A panel reserving space spans its edge and lets the compositor stack
    /// exclusive zones, so the edge margin stays zero. Everything else is
    /// pinned to the top-left corner of the output and offset by margins.
    pub fn for_placement(placement: &Placement) -> Self {
        let monitor = placement.monitor_geometry;
        let rel = placement.geometry.translated(-monitor.x, -monitor.y);

        let reserved = placement.strut.filter(|strut| strut.size > 0).and_then(|strut| {
            let spans = if strut.orientation.is_horizontal() {
                rel.width == monitor.width
            } else {
                rel.height == monitor.height
            };
            spans.then_some(strut.orientation)
        });

        match reserved {
            Some(orientation) => {
                let (first, second) = if orientation.is_horizontal() {
                    (Edge::Left, Edge::Right)
                } else {
                    (Edge::Top, Edge::Bottom)
                };
                let thickness = if orientation.is_horizontal() {
                    rel.height
                } else {
                    rel.width
                };

                Self {
                    anchors: vec![edge(orientation), first, second],
                    exclusive_zone: ExclusiveZone::Fixed(thickness),
                    ..Self::default()
                }
            }
            None => Self {
                anchors: vec![Edge::Top, Edge::Left],
                margins: LayerMargins {
                    top: rel.y,
                    left: rel.x,
                    ..LayerMargins::default()
                },
                ..Self::default()
            },
        }
    }
}

/// Layer-shell view of a panel window
pub struct LayerWindow<'a> {
    window: &'a Window,
}

impl<'a> LayerWindow<'a> {
    /// Turn `window` into a layer surface. Must run before it is realized.
    pub fn init(window: &'a Window) -> Self {
        window.init_layer_shell();
        let layer = Self { window };
        layer.apply(&LayerConfig::default());
        layer
    }

    pub fn wrap(window: &'a Window) -> Self {
        Self { window }
    }

    pub fn apply(&self, config: &LayerConfig) {
        self.window.set_layer(config.layer);
        self.set_anchors(&config.anchors);
        self.set_margins(config.margins);

        match config.exclusive_zone {
            ExclusiveZone::Auto => self.window.auto_exclusive_zone_enable(),
            ExclusiveZone::None => self.window.set_exclusive_zone(0),
            ExclusiveZone::Fixed(size) => self.window.set_exclusive_zone(size),
        }

        self.window.set_keyboard_mode(config.keyboard_mode);
        self.window.set_namespace(&config.namespace);

        debug!(
            "Layer surface: layer={:?}, anchors={:?}, zone={:?}",
            config.layer, config.anchors, config.exclusive_zone
        );
    }

    /// Update anchors (for panel position changes)
    pub fn set_anchors(&self, anchors: &[Edge]) {
        for edge in [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right] {
            self.window.set_anchor(edge, anchors.contains(&edge));
        }
    }

    pub fn set_margins(&self, margins: LayerMargins) {
        self.window.set_margin(Edge::Top, margins.top);
        self.window.set_margin(Edge::Right, margins.right);
        self.window.set_margin(Edge::Bottom, margins.bottom);
        self.window.set_margin(Edge::Left, margins.left);
    }

    pub fn set_monitor(&self, monitor: Option<&gdk::Monitor>) {
        self.window.set_monitor(monitor);
    }
}

/// GDK monitor whose rectangle matches a registry monitor
fn gdk_monitor(geometry: Rect) -> Option<gdk::Monitor> {
    let display = gdk::Display::default()?;
    let monitors = display.monitors();
    (0..monitors.n_items())
        .filter_map(|i| monitors.item(i).and_downcast::<gdk::Monitor>())
        .find(|m| {
            let g = m.geometry();
            Rect::new(g.x(), g.y(), g.width(), g.height()) == geometry
        })
}

/// Placement through wlr-layer-shell anchors and exclusive zones.
///
/// Compositors own the pointer, so keyboard grabs cannot warp it here.
pub struct LayerShellBackend {
    windows: WindowRegistry,
}

impl LayerShellBackend {
    pub fn new(windows: WindowRegistry) -> Self {
        Self { windows }
    }

    pub fn is_supported() -> bool {
        gtk4_layer_shell::is_supported()
    }
}

impl PlacementBackend for LayerShellBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn apply_placement(&mut self, toplevel: ToplevelId, placement: &Placement) -> mate_panel_core::Result<()> {
        let Some(window) = self.windows.get(toplevel) else {
            debug!("No surface for toplevel {} yet", toplevel);
            return Ok(());
        };

        let layer = LayerWindow::wrap(&window);
        layer.set_monitor(gdk_monitor(placement.monitor_geometry).as_ref());
        layer.apply(&LayerConfig::for_placement(placement));
        Ok(())
    }

    fn clear_placement(&mut self, toplevel: ToplevelId) -> mate_panel_core::Result<()> {
        if let Some(window) = self.windows.get(toplevel) {
            window.set_exclusive_zone(0);
        }
        Ok(())
    }

    fn warp_pointer(&mut self, _x: i32, _y: i32) -> mate_panel_core::Result<()> {
        Err(PanelError::Unsupported {
            backend: BACKEND,
            operation: "warp_pointer",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mate_panel_core::{PanelEdges, WmStrut};

    fn placement(geometry: Rect, strut: Option<WmStrut>) -> Placement {
        Placement {
            geometry,
            monitor: 1,
            monitor_geometry: Rect::new(1920, 0, 1920, 1080),
            orientation: Orientation::Top,
            edges: PanelEdges::empty(),
            mapped: true,
            strut,
        }
    }

    #[test]
    fn test_reserving_panel_spans_its_edge() {
        let strut = WmStrut {
            orientation: Orientation::Bottom,
            size: 24,
            start: 1920,
            end: 3839,
        };
        let config = LayerConfig::for_placement(&placement(Rect::new(1920, 1056, 1920, 24), Some(strut)));

        assert_eq!(config.anchors, vec![Edge::Bottom, Edge::Left, Edge::Right]);
        assert_eq!(config.exclusive_zone, ExclusiveZone::Fixed(24));
        assert_eq!(config.margins, LayerMargins::default());
    }

    #[test]
    fn test_floating_panel_pinned_by_margins() {
        let config = LayerConfig::for_placement(&placement(Rect::new(2020, 300, 200, 24), None));

        assert_eq!(config.anchors, vec![Edge::Top, Edge::Left]);
        assert_eq!(config.exclusive_zone, ExclusiveZone::None);
        assert_eq!(config.margins.left, 100);
        assert_eq!(config.margins.top, 300);
    }

    #[test]
    fn test_short_docked_panel_does_not_reserve() {
        let strut = WmStrut {
            orientation: Orientation::Top,
            size: 24,
            start: 2820,
            end: 3019,
        };
        let config = LayerConfig::for_placement(&placement(Rect::new(2820, 0, 200, 24), Some(strut)));

        assert_eq!(config.exclusive_zone, ExclusiveZone::None);
        assert_eq!(config.margins.left, 900);
    }
}
