use smallvec::SmallVec;
use tracing::debug;

use crate::geometry::{Orientation, PanelEdges, Rect};
use crate::messages::Property;
use crate::struts::StrutRequest;

use super::manager::PanelManager;
use super::size::compute_size;
use super::state::ToplevelState;
use super::ToplevelId;

/// Offset along an axis of `limit` pixels for an item of `size` pixels
/// placed from the near edge, the far edge, or centered
fn axis_offset(near: i32, far: Option<i32>, centered: bool, size: i32, limit: i32) -> i32 {
    if centered {
        (limit - size) / 2
    } else if let Some(far) = far {
        limit - size - far
    } else {
        near
    }
}

fn snap_to_edges(offset: i32, size: i32, limit: i32, tolerance: i32) -> i32 {
    if offset.abs() <= tolerance {
        0
    } else if (limit - size - offset).abs() <= tolerance {
        limit - size
    } else {
        offset
    }
}

/// Keep `[offset, offset + size)` inside `[0, limit)`. Oversized items
/// stick to the near edge.
pub(super) fn clamp_axis(offset: i32, size: i32, limit: i32) -> i32 {
    offset.min(limit - size).max(0)
}

/// Keep only `keep` pixels of `rect` along the `edge` side
fn retract(rect: Rect, edge: Orientation, keep: i32) -> Rect {
    match edge {
        Orientation::Top => Rect::new(rect.x, rect.y, rect.width, keep),
        Orientation::Bottom => Rect::new(rect.x, rect.bottom() - keep, rect.width, keep),
        Orientation::Left => Rect::new(rect.x, rect.y, keep, rect.height),
        Orientation::Right => Rect::new(rect.right() - keep, rect.y, keep, rect.height),
    }
}

impl PanelManager {
    /// Resolve which monitor the toplevel lives on.
    ///
    /// Drawers follow their parent. Otherwise the configured monitor wins when
    /// it exists; a missing one keeps the current monitor (or 0) and is tried
    /// again on every pass.
    pub(super) fn update_monitor(&mut self, id: ToplevelId) {
        let count = self.monitors.count();
        let parent_monitor = self
            .toplevels
            .get(&id)
            .and_then(|t| t.attached_to())
            .and_then(|parent| self.toplevels.get(&parent))
            .map(|parent| parent.monitor);

        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };

        let resolved = match parent_monitor {
            Some(monitor) => monitor,
            None if t.configured_monitor < count => t.configured_monitor,
            None if t.monitor < count => t.monitor,
            None => 0,
        };

        if resolved != t.monitor {
            debug!("Toplevel {} moves to monitor {}", id, resolved);
            t.monitor = resolved;
        }
    }

    pub(super) fn update_size(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };
        let monitor = self.monitors.geometry(t.monitor);
        let (width, height, allocations) = compute_size(t, monitor);

        if let Some(t) = self.toplevels.get_mut(&id) {
            t.original_width = width;
            t.original_height = height;
            t.applet_allocations = allocations;
        }
    }

    pub(super) fn update_position(&mut self, id: ToplevelId) {
        self.clear_stale_centering(id);
        self.resolve_position_centered(id);

        let Some(state) = self.toplevels.get(&id).map(|t| t.state) else {
            return;
        };
        let Some(rect) = self.target_rect(id, state) else {
            return;
        };

        if let Some(t) = self.toplevels.get_mut(&id) {
            let monitor = self.monitors.geometry(t.monitor);
            t.geometry = rect.translated(monitor.x, monitor.y);
        }
    }

    /// Centering only makes sense along the long axis: x for horizontal
    /// panels, y for vertical ones. Stale flags are dropped here, keeping the
    /// current position.
    fn clear_stale_centering(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        let monitor = self.monitors.geometry(t.monitor);
        let keep_position = t.updated_geometry_initial && !t.position_centered;

        let mut changed: SmallVec<[Property; 4]> = SmallVec::new();
        if t.x_centered && t.orientation.is_vertical() {
            t.x_centered = false;
            changed.push(Property::XCentered);
            if keep_position {
                t.x = t.geometry.x - monitor.x;
                changed.push(Property::X);
            }
        }
        if t.y_centered && t.orientation.is_horizontal() {
            t.y_centered = false;
            changed.push(Property::YCentered);
            if keep_position {
                t.y = t.geometry.y - monitor.y;
                changed.push(Property::Y);
            }
        }

        for property in changed {
            self.notify(id, property);
        }
    }

    /// After a rotation the position holds the panel center; turn it back
    /// into an edge offset now that the new size is known, measured from
    /// whichever edge is closer.
    fn resolve_position_centered(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        if !t.position_centered {
            return;
        }
        t.position_centered = false;

        let monitor = self.monitors.geometry(t.monitor);
        let (w, h) = (t.original_width, t.original_height);

        t.x -= w / 2;
        t.y -= h / 2;
        t.x_right = (t.x + w / 2 > monitor.width / 2).then(|| monitor.width - (t.x + w));
        t.y_bottom = (t.y + h / 2 > monitor.height / 2).then(|| monitor.height - (t.y + h));

        for property in [Property::X, Property::XRight, Property::Y, Property::YBottom] {
            self.notify(id, property);
        }
    }

    /// Monitor-relative rectangle the toplevel occupies in `state`.
    ///
    /// For docked panels this also registers (or drops) the strut the state
    /// reserves, so neighbours can react before an animation finishes.
    pub(super) fn target_rect(&mut self, id: ToplevelId, state: ToplevelState) -> Option<Rect> {
        if self.toplevels.get(&id)?.is_attached() {
            self.attached_rect(id, state)
        } else {
            self.docked_rect(id, state)
        }
    }

    fn docked_rect(&mut self, id: ToplevelId, state: ToplevelState) -> Option<Rect> {
        let tolerance = self.settings.snap_tolerance;
        let t = self.toplevels.get(&id)?;
        let monitor = self.monitors.geometry(t.monitor);
        let (w, h) = (t.original_width, t.original_height);
        let horizontal = t.orientation.is_horizontal();

        let (x, y) = if t.expand {
            match t.orientation {
                Orientation::Top => (0, 0),
                Orientation::Bottom => (0, monitor.height - h),
                Orientation::Left => (0, 0),
                Orientation::Right => (monitor.width - w, 0),
            }
        } else {
            let mut x = axis_offset(t.x, t.x_right, t.x_centered, w, monitor.width);
            let mut y = axis_offset(t.y, t.y_bottom, t.y_centered, h, monitor.height);
            if !t.x_centered {
                x = snap_to_edges(x, w, monitor.width, tolerance);
            }
            if !t.y_centered {
                y = snap_to_edges(y, h, monitor.height, tolerance);
            }
            (x, y)
        };

        let x = clamp_axis(x, w, monitor.width);
        let y = clamp_axis(y, h, monitor.height);
        let mut rect = Rect::new(x, y, w, h);

        let (floating, edge) = if horizontal {
            let edge = if y == 0 { Orientation::Top } else { Orientation::Bottom };
            (y != 0 && y + h != monitor.height, edge)
        } else {
            let edge = if x == 0 { Orientation::Left } else { Orientation::Right };
            (x != 0 && x + w != monitor.width, edge)
        };

        let auto_hide_size = t.effective_auto_hide_size();
        let reserves = matches!(state, ToplevelState::Normal | ToplevelState::AutoHidden);
        let request = (reserves && !floating).then(|| {
            let (start, end) = if horizontal {
                (monitor.x + x, monitor.x + x + w - 1)
            } else {
                (monitor.y + y, monitor.y + y + h - 1)
            };
            StrutRequest {
                toplevel: id,
                screen: 0,
                monitor: t.monitor,
                orientation: edge,
                size: if t.auto_hide { auto_hide_size } else { t.thickness() },
                start,
                end,
                scale: self.monitors.scale(t.monitor),
                depth: 0,
            }
        });
        let strip = t.hide_button_size.max(1).min(t.thickness().max(1));

        if let Some(t) = self.toplevels.get_mut(&id) {
            t.floating = floating;
        }

        let change = match request {
            Some(request) => self.struts.register_strut(&self.monitors, request),
            None => self.struts.unregister_strut(&self.monitors, id),
        };
        for other in change.others {
            if other != id {
                self.mark_dirty(other);
            }
        }

        let mut absolute = rect.translated(monitor.x, monitor.y);
        if self.struts.adjust_toplevel_geometry(id, &mut absolute, true) {
            rect = absolute.translated(-monitor.x, -monitor.y);
        }

        let rect = match state {
            ToplevelState::Normal => rect,
            ToplevelState::AutoHidden if floating => rect,
            ToplevelState::AutoHidden => retract(rect, edge, auto_hide_size),
            ToplevelState::HiddenUp => retract(rect, Orientation::Top, strip),
            ToplevelState::HiddenDown => retract(rect, Orientation::Bottom, strip),
            ToplevelState::HiddenLeft => retract(rect, Orientation::Left, strip),
            ToplevelState::HiddenRight => retract(rect, Orientation::Right, strip),
        };

        Some(rect)
    }

    /// Drawers sit flush against the parent's edge, centered on the widget
    /// that opened them, or tucked under the parent while not shown.
    fn attached_rect(&mut self, id: ToplevelId, state: ToplevelState) -> Option<Rect> {
        let t = self.toplevels.get(&id)?;
        let attachment = t.attachment.as_ref()?;
        let parent = self.toplevels.get(&attachment.parent)?;

        let monitor = self.monitors.geometry(t.monitor);
        let (w, h) = (t.original_width, t.original_height);
        let pg = parent.geometry;
        let widget = attachment.widget.unwrap_or(Rect::new(-w, -h, 0, 0));
        let shown = state == ToplevelState::Normal;

        let (x, y) = match parent.orientation {
            Orientation::Top => (
                widget.x + (widget.width - w) / 2,
                pg.y + if shown { pg.height } else { 0 },
            ),
            Orientation::Bottom => (
                widget.x + (widget.width - w) / 2,
                pg.y - if shown { h } else { 0 },
            ),
            Orientation::Left => (
                pg.x + if shown { pg.width } else { 0 },
                widget.y + (widget.height - h) / 2,
            ),
            Orientation::Right => (
                pg.x - if shown { w } else { 0 },
                widget.y + (widget.height - h) / 2,
            ),
        };

        let x = clamp_axis(x - monitor.x, w, monitor.width);
        let y = clamp_axis(y - monitor.y, h, monitor.height);
        Some(Rect::new(x, y, w, h))
    }

    /// Pick the frame sides that get a bevel: those facing the inside of
    /// the monitor, plus the ends of a centered floating panel and the sides
    /// carrying hide buttons.
    pub(super) fn update_edges(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        let monitor = self.monitors.geometry(t.monitor);
        let rel = t.geometry.translated(-monitor.x, -monitor.y);
        let horizontal = t.orientation.is_horizontal();

        let mut edges = PanelEdges::empty();
        if rel.y > 0 {
            edges |= PanelEdges::TOP;
        }
        if rel.x > 0 {
            edges |= PanelEdges::LEFT;
        }
        if rel.y < monitor.height - rel.height {
            edges |= PanelEdges::BOTTOM;
        }
        if rel.x < monitor.width - rel.width {
            edges |= PanelEdges::RIGHT;
        }

        if !t.expand {
            if horizontal && t.x_centered {
                edges |= PanelEdges::LEFT | PanelEdges::RIGHT;
            }
            if !horizontal && t.y_centered {
                edges |= PanelEdges::TOP | PanelEdges::BOTTOM;
            }
        }

        if t.hide_buttons_visible() {
            edges |= if horizontal {
                PanelEdges::LEFT | PanelEdges::RIGHT
            } else {
                PanelEdges::TOP | PanelEdges::BOTTOM
            };
        }

        t.edges = edges;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::clock::ManualClock;
    use crate::config::{EngineSettings, ToplevelConfig};
    use crate::monitor::{Monitor, MonitorRegistry};

    fn manager() -> PanelManager {
        let monitors = MonitorRegistry::with_monitors(vec![Monitor::new(Rect::new(0, 0, 1920, 1080))]);
        PanelManager::new(
            monitors,
            Box::new(RecordingBackend::new()),
            Box::new(ManualClock::new()),
            EngineSettings::default(),
        )
    }

    fn floating(orientation: Orientation) -> ToplevelConfig {
        let mut config = ToplevelConfig::new("floating");
        config.orientation = orientation;
        config.expand = false;
        config
    }

    fn shown(manager: &mut PanelManager, config: &ToplevelConfig) -> ToplevelId {
        let id = manager.create_toplevel(config);
        manager.process_timers();
        id
    }

    #[test]
    fn test_axis_offset_representations() {
        assert_eq!(axis_offset(30, None, false, 100, 1000), 30);
        assert_eq!(axis_offset(30, Some(50), false, 100, 1000), 850);
        assert_eq!(axis_offset(30, Some(50), true, 100, 1000), 450);
    }

    #[test]
    fn test_clamp_axis_handles_oversized_items() {
        assert_eq!(clamp_axis(-5, 10, 100), 0);
        assert_eq!(clamp_axis(95, 10, 100), 90);
        assert_eq!(clamp_axis(20, 200, 100), 0);
    }

    #[test]
    fn test_retract_keeps_docked_side() {
        let rect = Rect::new(0, 1056, 1920, 24);
        assert_eq!(retract(rect, Orientation::Bottom, 1), Rect::new(0, 1079, 1920, 1));
        assert_eq!(retract(rect, Orientation::Top, 3), Rect::new(0, 1056, 1920, 3));
    }

    #[test]
    fn test_floating_panel_snaps_to_edge() {
        let mut manager = manager();
        let mut config = floating(Orientation::Top);
        config.x = 30;
        config.y = 20;
        let id = shown(&mut manager, &config);

        let t = manager.toplevel(id).unwrap();
        assert_eq!((t.geometry().x, t.geometry().y), (0, 0));
        assert!(!t.is_floating());
        let before = t.geometry();

        manager.mark_dirty(id);
        manager.flush();
        let again = manager.toplevel(id).unwrap();
        assert_eq!(again.geometry(), before);
    }

    #[test]
    fn test_far_edge_offset() {
        let mut manager = manager();
        let mut config = floating(Orientation::Bottom);
        config.x = 0;
        config.x_right = Some(100);
        config.y_bottom = Some(0);
        let id = shown(&mut manager, &config);

        let g = manager.toplevel(id).unwrap().geometry();
        assert_eq!(g.right(), 1920 - 100);
        assert_eq!(g.bottom(), 1080);
    }

    #[test]
    fn test_panel_away_from_edges_floats_without_strut() {
        let mut manager = manager();
        let mut config = floating(Orientation::Top);
        config.x = 300;
        config.y = 400;
        let id = shown(&mut manager, &config);

        let t = manager.toplevel(id).unwrap();
        assert!(t.is_floating());
        assert_eq!((t.geometry().x, t.geometry().y), (300, 400));
        assert!(manager.struts().find(id).is_none());
    }

    #[test]
    fn test_x_centering_dropped_on_vertical_panel() {
        let mut manager = manager();
        let mut config = floating(Orientation::Left);
        config.x_centered = true;
        config.y_centered = true;
        let id = shown(&mut manager, &config);

        let t = manager.toplevel(id).unwrap();
        assert!(!t.x_centered());
        assert!(t.y_centered());
        let g = t.geometry();
        assert_eq!(g.y, (1080 - g.height) / 2);
    }

    #[test]
    fn test_rotation_keeps_floating_panel_center() {
        let mut manager = manager();
        let mut config = floating(Orientation::Top);
        config.x = 400;
        config.y = 300;
        let id = shown(&mut manager, &config);
        let before = manager.toplevel(id).unwrap().geometry().center();

        manager.set_orientation(id, Orientation::Left);
        manager.flush();

        let after = manager.toplevel(id).unwrap().geometry().center();
        assert!((after.x - before.x).abs() <= 1);
        assert!((after.y - before.y).abs() <= 1);
    }

    #[test]
    fn test_edges_face_the_monitor_interior() {
        let mut manager = manager();
        let id = shown(&mut manager, &ToplevelConfig::new("top"));
        assert_eq!(manager.toplevel(id).unwrap().edges(), PanelEdges::BOTTOM);

        manager.set_enable_buttons(id, true);
        manager.flush();
        assert_eq!(
            manager.toplevel(id).unwrap().edges(),
            PanelEdges::BOTTOM | PanelEdges::LEFT | PanelEdges::RIGHT
        );
    }
}
