//! Interactive move and resize
//!
//! One grab per toplevel at a time. Pointer grabs follow
//! [`PanelManager::pointer_motion`]; keyboard grabs warp the pointer through
//! the backend and feed the warped position through the same motion path.

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::config::{KEYBOARD_NUDGE, KEYBOARD_NUDGE_FINE};
use crate::geometry::{Orientation, Point};
use crate::messages::ToplevelEvent;

use super::manager::PanelManager;
use super::state::ToplevelState;
use super::ToplevelId;

/// Interactive operation in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrabOp {
    Move,
    /// Resize with the edge still to be picked by an arrow key
    Resize,
    ResizeUp,
    ResizeDown,
    ResizeLeft,
    ResizeRight,
}

impl GrabOp {
    pub fn is_resize(self) -> bool {
        self != GrabOp::Move
    }
}

bitflags! {
    /// Modifier keys held during pointer motion or a key press
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InputModifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
    }
}

/// Keys a grab reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrabKey {
    Up,
    Down,
    Left,
    Right,
    Escape,
    Return,
    Space,
}

/// Running grab plus what Escape restores
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grab {
    pub op: GrabOp,
    pub keyboard: bool,
    orientation: Orientation,
    monitor: usize,
    size: i32,
    x: i32,
    x_right: Option<i32>,
    x_centered: bool,
    y: i32,
    y_bottom: Option<i32>,
    y_centered: bool,
}

impl PanelManager {
    /// Start an interactive operation.
    ///
    /// Refused while the panel is not shown, already grabbed, or locked
    /// against the operation.
    pub fn begin_grab_op(&mut self, id: ToplevelId, op: GrabOp, keyboard: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };

        if t.state != ToplevelState::Normal || t.grab.is_some() {
            return false;
        }
        let allowed = if op.is_resize() {
            t.lockdown.can_resize()
        } else {
            t.lockdown.can_move()
        };
        if !allowed {
            debug!("Toplevel {} is locked against {:?}", id, op);
            return false;
        }

        t.grab = Some(Grab {
            op,
            keyboard,
            orientation: t.orientation,
            monitor: t.configured_monitor,
            size: t.size,
            x: t.x,
            x_right: t.x_right,
            x_centered: t.x_centered,
            y: t.y,
            y_bottom: t.y_bottom,
            y_centered: t.y_centered,
        });

        let g = t.geometry;
        let pointer = if keyboard {
            match op {
                GrabOp::Move | GrabOp::Resize => g.center(),
                GrabOp::ResizeUp => Point::new(g.x + g.width / 2, g.y),
                GrabOp::ResizeDown => Point::new(g.x + g.width / 2, g.bottom()),
                GrabOp::ResizeLeft => Point::new(g.x, g.y + g.height / 2),
                GrabOp::ResizeRight => Point::new(g.right(), g.y + g.height / 2),
            }
        } else {
            self.pointer
        };

        t.drag_offset = match op {
            GrabOp::Move | GrabOp::Resize => Point::new(pointer.x - g.x, pointer.y - g.y),
            GrabOp::ResizeUp => Point::new(0, g.bottom()),
            GrabOp::ResizeDown => Point::new(0, g.y),
            GrabOp::ResizeLeft => Point::new(g.right(), 0),
            GrabOp::ResizeRight => Point::new(g.x, 0),
        };

        debug!("Toplevel {} begins {:?} (keyboard: {})", id, op, keyboard);

        if keyboard {
            self.warp_pointer(pointer);
        }
        true
    }

    /// Finish the grab, keeping the result
    pub fn end_grab_op(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        if t.grab.take().is_none() {
            return;
        }
        if !t.pointer_inside {
            self.queue_auto_hide(id);
        }
    }

    /// Finish the grab, restoring what the panel looked like before it
    pub fn cancel_grab_op(&mut self, id: ToplevelId) {
        let Some(snapshot) = self.toplevels.get(&id).and_then(|t| t.grab.clone()) else {
            return;
        };

        self.set_orientation(id, snapshot.orientation);
        self.set_monitor(id, snapshot.monitor);
        self.set_size(id, snapshot.size);
        self.set_x(id, snapshot.x, snapshot.x_right, snapshot.x_centered);
        self.set_y(id, snapshot.y, snapshot.y_bottom, snapshot.y_centered);
        self.end_grab_op(id);
    }

    fn grabbed(&self) -> Option<(ToplevelId, GrabOp)> {
        self.toplevels()
            .find_map(|t| t.grab.as_ref().map(|grab| (t.id, grab.op)))
    }

    fn warp_pointer(&mut self, to: Point) {
        if let Err(e) = self.backend.warp_pointer(to.x, to.y) {
            warn!("Pointer warp to {},{} failed: {}", to.x, to.y, e);
        }
        self.pointer = to;
    }

    /// Pointer moved to `(x, y)` in desktop coordinates
    pub fn pointer_motion(&mut self, x: i32, y: i32, modifiers: InputModifiers) {
        self.pointer = Point::new(x, y);
        if let Some((id, op)) = self.grabbed() {
            self.grab_motion(id, op, modifiers);
        }
    }

    fn grab_motion(&mut self, id: ToplevelId, op: GrabOp, modifiers: InputModifiers) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };
        let (expand, offset) = (t.expand, t.drag_offset);
        let pointer = self.pointer;

        match op {
            GrabOp::Move if expand => self.calc_new_orientation(id, pointer),
            GrabOp::Move if modifiers.contains(InputModifiers::CONTROL) => self.rotate_to_pointer(id, pointer),
            GrabOp::Move => self.move_to(id, pointer.x - offset.x, pointer.y - offset.y),
            GrabOp::Resize => {}
            _ => self.resize_to_pointer(id, op, pointer),
        }
    }

    /// An expanded panel follows the pointer from edge to edge: a band of
    /// one and a half panel thicknesses along each monitor side claims the
    /// panel for that side.
    fn calc_new_orientation(&mut self, id: ToplevelId, pointer: Point) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };
        let new_monitor = self.monitors.monitor_at_point(pointer.x, pointer.y);
        let m = self.monitors.geometry(new_monitor);
        let g = t.geometry;
        let border = (3 * g.width.min(g.height)) >> 1;
        let (px, py) = (pointer.x, pointer.y);

        let in_left = px < m.x + border;
        let in_right = px > m.right() - border;
        let in_top = py < m.y + border;
        let in_bottom = py > m.bottom() - border;

        let mut orientation = t.orientation;
        match t.orientation {
            Orientation::Top => {
                if in_bottom {
                    orientation = Orientation::Bottom;
                } else if py > m.y + border {
                    if in_right {
                        orientation = Orientation::Right;
                    } else if in_left {
                        orientation = Orientation::Left;
                    }
                }
            }
            Orientation::Bottom => {
                if in_top {
                    orientation = Orientation::Top;
                } else if py < m.bottom() - border {
                    if in_right {
                        orientation = Orientation::Right;
                    } else if in_left {
                        orientation = Orientation::Left;
                    }
                }
            }
            Orientation::Left => {
                if in_right {
                    orientation = Orientation::Right;
                } else if px > m.x + border {
                    if in_bottom {
                        orientation = Orientation::Bottom;
                    } else if in_top {
                        orientation = Orientation::Top;
                    }
                }
            }
            Orientation::Right => {
                if in_left {
                    orientation = Orientation::Left;
                } else if px < m.right() - border {
                    if in_bottom {
                        orientation = Orientation::Bottom;
                    } else if in_top {
                        orientation = Orientation::Top;
                    }
                }
            }
        }

        self.set_monitor(id, new_monitor);
        self.set_orientation(id, orientation);
    }

    /// Rotate around the panel center.
    ///
    /// The diagonals through the center, widened by the snap tolerance,
    /// split the plane into four quadrants; the one holding the pointer
    /// names the new edge. Inside the tolerance band nothing changes.
    fn rotate_to_pointer(&mut self, id: ToplevelId, pointer: Point) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };
        if let Some(orientation) = quadrant_orientation(t.geometry.center(), pointer, self.settings.snap_tolerance) {
            self.set_orientation(id, orientation);
        }
    }

    /// Drag a floating panel so its top-left corner lands at `(x, y)`.
    ///
    /// Coming within the snap tolerance of the opposite screen edge flips the
    /// orientation; near the monitor center the long axis centers; otherwise
    /// the offset is kept from the closer edge.
    fn move_to(&mut self, id: ToplevelId, x: i32, y: i32) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };
        let tolerance = self.settings.snap_tolerance;
        let screen = self.monitors.screen();
        let (w, h) = (t.geometry.width, t.geometry.height);

        let mut orientation = t.orientation;
        if orientation.is_vertical() {
            if x <= screen.x + tolerance {
                orientation = Orientation::Left;
            } else if x + w >= screen.right() - tolerance {
                orientation = Orientation::Right;
            }
        } else if y <= screen.y + tolerance {
            orientation = Orientation::Top;
        } else if y + h >= screen.bottom() - tolerance {
            orientation = Orientation::Bottom;
        }

        let monitor = self.monitors.monitor_at_point(x, y);
        let m = self.monitors.geometry(monitor);
        let (x, y) = (x - m.x, y - m.y);

        let (mut x_centered, mut y_centered) = (false, false);
        if orientation.is_horizontal() {
            x_centered = (x - (m.width - w) / 2).abs() <= tolerance;
        } else {
            y_centered = (y - (m.height - h) / 2).abs() <= tolerance;
        }

        let x_right = (x + w / 2 > m.width / 2).then(|| m.width - (x + w));
        let y_bottom = (y + h / 2 > m.height / 2).then(|| m.height - (y + h));

        self.set_monitor(id, monitor);
        self.set_orientation(id, orientation);
        self.set_x(id, x, x_right, x_centered);
        self.set_y(id, y, y_bottom, y_centered);
    }

    /// Drag one edge; the opposite edge stays where the grab found it
    fn resize_to_pointer(&mut self, id: ToplevelId, op: GrabOp, pointer: Point) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };
        let m = self.monitors.geometry(t.monitor);
        let anchor = t.drag_offset;
        let expand = t.expand;

        let (size, start) = match op {
            GrabOp::ResizeUp => {
                let size = (anchor.y - pointer.y).clamp(0, m.height / 4);
                (size, anchor.y - size)
            }
            GrabOp::ResizeDown => ((pointer.y - anchor.y).clamp(0, m.height / 4), anchor.y),
            GrabOp::ResizeLeft => {
                let size = (anchor.x - pointer.x).clamp(0, m.width / 4);
                (size, anchor.x - size)
            }
            GrabOp::ResizeRight => ((pointer.x - anchor.x).clamp(0, m.width / 4), anchor.x),
            GrabOp::Move | GrabOp::Resize => return,
        };

        if size == 0 {
            return;
        }

        if !expand {
            match op {
                GrabOp::ResizeUp | GrabOp::ResizeDown => {
                    self.set_y(id, start - m.y, None, false);
                }
                _ => {
                    self.set_x(id, start - m.x, None, false);
                }
            }
        }
        self.set_size(id, size);
    }

    /// Key press while `id` holds a grab. Returns whether it was consumed.
    pub fn key_press(&mut self, id: ToplevelId, key: GrabKey, modifiers: InputModifiers) -> bool {
        let Some(t) = self.toplevels.get(&id) else {
            return false;
        };
        let Some(op) = t.grab.as_ref().map(|g| g.op) else {
            return false;
        };
        let (expand, orientation) = (t.expand, t.orientation);

        let (dx, dy) = match key {
            GrabKey::Escape => {
                self.cancel_grab_op(id);
                return true;
            }
            GrabKey::Return | GrabKey::Space => {
                self.end_grab_op(id);
                return true;
            }
            GrabKey::Up => (0, -1),
            GrabKey::Down => (0, 1),
            GrabKey::Left => (-1, 0),
            GrabKey::Right => (1, 0),
        };

        if op == GrabOp::Move && expand {
            let edge = match key {
                GrabKey::Up => Orientation::Top,
                GrabKey::Down => Orientation::Bottom,
                GrabKey::Left => Orientation::Left,
                _ => Orientation::Right,
            };
            self.set_orientation(id, edge);
            return true;
        }

        if op == GrabOp::Resize {
            let edge_op = match key {
                GrabKey::Up if orientation.is_horizontal() => Some(GrabOp::ResizeUp),
                GrabKey::Down if orientation.is_horizontal() => Some(GrabOp::ResizeDown),
                GrabKey::Left if orientation.is_vertical() => Some(GrabOp::ResizeLeft),
                GrabKey::Right if orientation.is_vertical() => Some(GrabOp::ResizeRight),
                _ => None,
            };
            let Some(edge_op) = edge_op else {
                return false;
            };
            self.end_grab_op(id);
            return self.begin_grab_op(id, edge_op, true);
        }

        let step = if modifiers.contains(InputModifiers::SHIFT) {
            KEYBOARD_NUDGE_FINE
        } else {
            KEYBOARD_NUDGE
        };
        let to = Point::new(self.pointer.x + dx * step, self.pointer.y + dy * step);
        self.warp_pointer(to);
        self.grab_motion(id, op, modifiers);
        true
    }

    // =========== Actions ===========

    /// Start a keyboard move, as the panel menu does
    pub fn begin_move(&mut self, id: ToplevelId) -> bool {
        self.emit(id, ToplevelEvent::BeginMove);
        self.begin_grab_op(id, GrabOp::Move, true)
    }

    /// Start a keyboard resize; the first arrow key picks the edge
    pub fn begin_resize(&mut self, id: ToplevelId) -> bool {
        self.emit(id, ToplevelEvent::BeginResize);
        self.begin_grab_op(id, GrabOp::Resize, true)
    }

    pub fn toggle_expand(&mut self, id: ToplevelId) -> bool {
        let Some(expand) = self.toplevels.get(&id).map(|t| t.expand) else {
            return false;
        };
        let changed = self.set_expand(id, !expand);
        if changed {
            self.emit(id, ToplevelEvent::ExpandToggled);
        }
        changed
    }

    pub fn expand(&mut self, id: ToplevelId) -> bool {
        let changed = self.set_expand(id, true);
        if changed {
            self.emit(id, ToplevelEvent::ExpandToggled);
        }
        changed
    }

    pub fn unexpand(&mut self, id: ToplevelId) -> bool {
        let changed = self.set_expand(id, false);
        if changed {
            self.emit(id, ToplevelEvent::ExpandToggled);
        }
        changed
    }

    /// Hide toward the docked edge, or unhide
    pub fn toggle_hidden(&mut self, id: ToplevelId) {
        let Some(state) = self.toplevels.get(&id).map(|t| t.state) else {
            return;
        };
        if state == ToplevelState::Normal {
            self.hide(id, false, None);
        } else {
            self.unhide(id);
        }
        self.emit(id, ToplevelEvent::HiddenToggled);
    }

    pub fn popup_panel_menu(&mut self, id: ToplevelId) {
        if self.toplevels.contains_key(&id) {
            self.emit(id, ToplevelEvent::PopupMenuRequested);
        }
    }
}

/// Edge picked by a pointer around `center`, or `None` while the pointer is
/// within `tolerance` of a diagonal
fn quadrant_orientation(center: Point, pointer: Point, tolerance: i32) -> Option<Orientation> {
    let x_diff = pointer.x - center.x;
    let y_diff = pointer.y - center.y;

    if -y_diff > x_diff.abs() + tolerance {
        Some(Orientation::Top)
    } else if y_diff > x_diff.abs() + tolerance {
        Some(Orientation::Bottom)
    } else if -x_diff > y_diff.abs() + tolerance {
        Some(Orientation::Left)
    } else if x_diff > y_diff.abs() + tolerance {
        Some(Orientation::Right)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::clock::ManualClock;
    use crate::config::{EngineSettings, Lockdown, ToplevelConfig};
    use crate::geometry::Rect;
    use crate::monitor::{Monitor, MonitorRegistry};

    fn manager() -> (PanelManager, RecordingBackend) {
        let backend = RecordingBackend::new();
        let monitors = MonitorRegistry::with_monitors(vec![Monitor::new(Rect::new(0, 0, 1920, 1080))]);
        let manager = PanelManager::new(
            monitors,
            Box::new(backend.clone()),
            Box::new(ManualClock::new()),
            EngineSettings::default(),
        );
        (manager, backend)
    }

    fn shown(manager: &mut PanelManager, config: &ToplevelConfig) -> ToplevelId {
        let id = manager.create_toplevel(config);
        manager.process_timers();
        id
    }

    #[test]
    fn test_grab_refused_when_locked_or_busy() {
        let (mut manager, _) = manager();
        let mut config = ToplevelConfig::new("top");
        config.lockdown = Lockdown {
            locked_down: false,
            size_writable: false,
            position_writable: true,
        };
        let id = shown(&mut manager, &config);

        assert!(!manager.begin_grab_op(id, GrabOp::ResizeDown, false));
        assert!(manager.begin_grab_op(id, GrabOp::Move, false));
        assert!(!manager.begin_grab_op(id, GrabOp::Move, false));
        manager.end_grab_op(id);
        assert_eq!(manager.toplevel(id).unwrap().grab_op(), None);
    }

    #[test]
    fn test_keyboard_move_warps_to_center() {
        let (mut manager, backend) = manager();
        let id = shown(&mut manager, &ToplevelConfig::new("top"));

        assert!(manager.begin_move(id));
        assert_eq!(backend.warps(), vec![(960, 12)]);
        assert_eq!(manager.toplevel(id).unwrap().grab_op(), Some(GrabOp::Move));
    }

    #[test]
    fn test_arrow_docks_expanded_panel() {
        let (mut manager, _) = manager();
        let id = shown(&mut manager, &ToplevelConfig::new("top"));

        manager.begin_move(id);
        assert!(manager.key_press(id, GrabKey::Left, InputModifiers::empty()));
        assert_eq!(manager.toplevel(id).unwrap().orientation(), Orientation::Left);

        assert!(manager.key_press(id, GrabKey::Escape, InputModifiers::empty()));
        assert_eq!(manager.toplevel(id).unwrap().orientation(), Orientation::Top);
        assert_eq!(manager.toplevel(id).unwrap().grab_op(), None);
    }

    #[test]
    fn test_dragging_expanded_panel_to_bottom() {
        let (mut manager, _) = manager();
        let id = shown(&mut manager, &ToplevelConfig::new("top"));

        manager.pointer_motion(960, 10, InputModifiers::empty());
        manager.begin_grab_op(id, GrabOp::Move, false);
        manager.pointer_motion(960, 1075, InputModifiers::empty());
        manager.flush();
        manager.end_grab_op(id);

        let t = manager.toplevel(id).unwrap();
        assert_eq!(t.orientation(), Orientation::Bottom);
        assert_eq!(t.geometry(), Rect::new(0, 1056, 1920, 24));
    }

    #[test]
    fn test_keyboard_resize_picks_edge_then_nudges() {
        let (mut manager, backend) = manager();
        let id = shown(&mut manager, &ToplevelConfig::new("top"));

        assert!(manager.begin_resize(id));
        assert!(!manager.key_press(id, GrabKey::Left, InputModifiers::empty()));
        assert!(manager.key_press(id, GrabKey::Down, InputModifiers::empty()));
        assert_eq!(manager.toplevel(id).unwrap().grab_op(), Some(GrabOp::ResizeDown));
        assert_eq!(backend.warps().last(), Some(&(960, 24)));

        manager.key_press(id, GrabKey::Down, InputModifiers::empty());
        assert_eq!(manager.toplevel(id).unwrap().size(), 34);

        manager.key_press(id, GrabKey::Up, InputModifiers::SHIFT);
        assert_eq!(manager.toplevel(id).unwrap().size(), 33);

        manager.key_press(id, GrabKey::Return, InputModifiers::empty());
        manager.flush();
        assert_eq!(manager.toplevel(id).unwrap().geometry().height, 33);
    }

    #[test]
    fn test_failed_warp_still_moves() {
        let backend = RecordingBackend::new().failing_warps();
        let monitors = MonitorRegistry::with_monitors(vec![Monitor::new(Rect::new(0, 0, 1920, 1080))]);
        let mut manager = PanelManager::new(
            monitors,
            Box::new(backend),
            Box::new(ManualClock::new()),
            EngineSettings::default(),
        );
        let id = shown(&mut manager, &ToplevelConfig::new("top"));

        manager.begin_resize(id);
        manager.key_press(id, GrabKey::Down, InputModifiers::empty());
        manager.key_press(id, GrabKey::Down, InputModifiers::empty());
        assert_eq!(manager.toplevel(id).unwrap().size(), 34);
    }

    #[test]
    fn test_toggle_actions() {
        let (mut manager, _) = manager();
        let id = shown(&mut manager, &ToplevelConfig::new("top"));

        assert!(manager.toggle_expand(id));
        let t = manager.toplevel(id).unwrap();
        assert!(!t.expand());
        assert!(t.x_centered());

        manager.toggle_hidden(id);
        assert_eq!(manager.toplevel(id).unwrap().state(), ToplevelState::HiddenUp);
        manager.toggle_hidden(id);
        assert_eq!(manager.toplevel(id).unwrap().state(), ToplevelState::Normal);
    }

    #[test]
    fn test_quadrant_orientation() {
        let center = Point::new(500, 500);
        let at = |dx: i32, dy: i32| quadrant_orientation(center, Point::new(500 + dx, 500 + dy), 48);

        assert_eq!(at(5, -400), Some(Orientation::Top));
        assert_eq!(at(-5, 400), Some(Orientation::Bottom));
        assert_eq!(at(-400, 5), Some(Orientation::Left));
        assert_eq!(at(400, -5), Some(Orientation::Right));
        assert_eq!(at(100, 90), None);
        assert_eq!(at(0, 0), None);
    }

    #[test]
    fn test_control_drag_rotates_toward_pointer() {
        let (mut manager, _) = manager();
        let mut config = ToplevelConfig::new("side");
        config.orientation = Orientation::Left;
        config.expand = false;
        config.x = 600;
        config.y = 300;
        let id = shown(&mut manager, &config);
        let center = manager.toplevel(id).unwrap().geometry().center();

        manager.pointer_motion(center.x, center.y, InputModifiers::empty());
        assert!(manager.begin_grab_op(id, GrabOp::Move, false));

        // Straight above a vertical panel
        manager.pointer_motion(center.x + 5, center.y - 400, InputModifiers::CONTROL);
        assert_eq!(manager.toplevel(id).unwrap().orientation(), Orientation::Top);

        // Top flips to bottom without passing through a side
        manager.pointer_motion(center.x - 5, center.y + 400, InputModifiers::CONTROL);
        assert_eq!(manager.toplevel(id).unwrap().orientation(), Orientation::Bottom);

        manager.pointer_motion(center.x + 400, center.y, InputModifiers::CONTROL);
        assert_eq!(manager.toplevel(id).unwrap().orientation(), Orientation::Right);

        // Near a diagonal the orientation holds
        manager.pointer_motion(center.x - 300, center.y - 290, InputModifiers::CONTROL);
        assert_eq!(manager.toplevel(id).unwrap().orientation(), Orientation::Right);

        manager.pointer_motion(center.x - 400, center.y + 5, InputModifiers::CONTROL);
        assert_eq!(manager.toplevel(id).unwrap().orientation(), Orientation::Left);
        manager.end_grab_op(id);
    }
}
