//! Reserved-space bookkeeping
//!
//! Every docked toplevel registers the band it wants to reserve along its
//! edge. When several panels want the same band the registry stacks them and
//! hands each one back an allocated rectangle; the toplevel then shifts its
//! own geometry by the difference.

use std::cmp::Ordering;

use smallvec::SmallVec;
use tracing::debug;

use crate::geometry::{Orientation, Rect};
use crate::monitor::MonitorRegistry;
use crate::toplevel::ToplevelId;

/// Arguments of a strut registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrutRequest {
    pub toplevel: ToplevelId,
    pub screen: usize,
    pub monitor: usize,
    pub orientation: Orientation,
    /// Thickness of the reserved band
    pub size: i32,
    /// First desktop coordinate covered along the edge
    pub start: i32,
    /// Last desktop coordinate covered along the edge (inclusive)
    pub end: i32,
    pub scale: i32,
    /// Attachment depth; drawers resolve before their parents
    pub depth: u32,
}

/// A registered strut with its allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelStrut {
    pub toplevel: ToplevelId,
    pub screen: usize,
    pub monitor: usize,
    pub orientation: Orientation,
    pub depth: u32,
    pub scale: i32,

    pub size: i32,
    pub start: i32,
    pub end: i32,
    pub geometry: Rect,

    pub allocated_size: i32,
    pub allocated_start: i32,
    pub allocated_end: i32,
    pub allocated_geometry: Rect,
}

impl PanelStrut {
    fn matches(&self, request: &StrutRequest) -> bool {
        self.orientation == request.orientation
            && self.screen == request.screen
            && self.monitor == request.monitor
            && self.size == request.size
            && self.start == request.start
            && self.end == request.end
            && self.scale == request.scale
            && self.depth == request.depth
    }
}

/// Outcome of a registry mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrutChange {
    /// The toplevel that made the call saw its allocation move
    pub toplevel_changed: bool,
    /// Other toplevels whose allocation moved and that need a new geometry pass
    pub others: SmallVec<[ToplevelId; 4]>,
}

/// Value published to the window manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmStrut {
    pub orientation: Orientation,
    pub size: u32,
    pub start: u32,
    pub end: u32,
}

impl WmStrut {
    /// Twelve-value `_NET_WM_STRUT_PARTIAL` layout
    pub fn partial(&self) -> [u32; 12] {
        let mut values = [0u32; 12];
        let (size_index, start_index) = match self.orientation {
            Orientation::Left => (0, 4),
            Orientation::Right => (1, 6),
            Orientation::Top => (2, 8),
            Orientation::Bottom => (3, 10),
        };
        values[size_index] = self.size;
        values[start_index] = self.start;
        values[start_index + 1] = self.end;
        values
    }

    /// Four-value `_NET_WM_STRUT` layout
    pub fn legacy(&self) -> [u32; 4] {
        let partial = self.partial();
        [partial[0], partial[1], partial[2], partial[3]]
    }
}

/// All struts of the process, kept sorted in allocation order
#[derive(Debug, Default)]
pub struct StrutRegistry {
    struts: Vec<PanelStrut>,
}

impl StrutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.struts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.struts.is_empty()
    }

    pub fn find(&self, toplevel: ToplevelId) -> Option<&PanelStrut> {
        self.struts.iter().find(|s| s.toplevel == toplevel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PanelStrut> {
        self.struts.iter()
    }

    /// Insert or update the strut of `request.toplevel`.
    ///
    /// Identical requests are no-ops and report no change.
    pub fn register_strut(&mut self, monitors: &MonitorRegistry, request: StrutRequest) -> StrutChange {
        let existing = self.struts.iter().position(|s| s.toplevel == request.toplevel);

        if let Some(index) = existing {
            if self.struts[index].matches(&request) {
                return StrutChange::default();
            }
        }

        let monitor = monitors.geometry(request.monitor);
        let span = request.end - request.start + 1;
        let geometry = match request.orientation {
            Orientation::Top => Rect::new(request.start, monitor.y, span, request.size),
            Orientation::Bottom => {
                Rect::new(request.start, monitor.bottom() - request.size, span, request.size)
            }
            Orientation::Left => Rect::new(monitor.x, request.start, request.size, span),
            Orientation::Right => {
                Rect::new(monitor.right() - request.size, request.start, request.size, span)
            }
        };

        // A previous allocation for a different monitor must not leak into
        // the change detection of the new one
        let previous_monitor = existing.map(|i| (self.struts[i].screen, self.struts[i].monitor));

        let strut = PanelStrut {
            toplevel: request.toplevel,
            screen: request.screen,
            monitor: request.monitor,
            orientation: request.orientation,
            depth: request.depth,
            scale: request.scale.max(1),
            size: request.size,
            start: request.start,
            end: request.end,
            geometry,
            allocated_size: existing.map(|i| self.struts[i].allocated_size).unwrap_or(0),
            allocated_start: existing.map(|i| self.struts[i].allocated_start).unwrap_or(0),
            allocated_end: existing.map(|i| self.struts[i].allocated_end).unwrap_or(0),
            allocated_geometry: existing
                .map(|i| self.struts[i].allocated_geometry)
                .unwrap_or_default(),
        };

        match existing {
            Some(index) => self.struts[index] = strut,
            None => self.struts.push(strut),
        }

        self.sort();

        let mut change = self.allocate(monitors, request.toplevel, request.screen, request.monitor);

        if let Some((screen, monitor)) = previous_monitor {
            if screen != request.screen || monitor != request.monitor {
                let old = self.allocate(monitors, request.toplevel, screen, monitor);
                merge_others(&mut change, old.others);
            }
        }

        change
    }

    /// Drop the strut of `toplevel` and reallocate its monitor.
    ///
    /// Returns the other toplevels whose allocation moved.
    pub fn unregister_strut(&mut self, monitors: &MonitorRegistry, toplevel: ToplevelId) -> StrutChange {
        let Some(index) = self.struts.iter().position(|s| s.toplevel == toplevel) else {
            return StrutChange::default();
        };

        let removed = self.struts.remove(index);
        debug!("Unregistered strut of toplevel {}", toplevel);

        self.allocate(monitors, toplevel, removed.screen, removed.monitor)
    }

    /// Forget every strut, used when the monitor inventory is rebuilt and
    /// each toplevel registers again against the new geometry.
    ///
    /// Returns the toplevels that had one.
    pub fn clear(&mut self) -> SmallVec<[ToplevelId; 4]> {
        self.struts.drain(..).map(|s| s.toplevel).collect()
    }

    fn sort(&mut self) {
        self.struts.sort_by(compare_struts);
    }

    fn allocate(
        &mut self,
        monitors: &MonitorRegistry,
        toplevel: ToplevelId,
        screen: usize,
        monitor: usize,
    ) -> StrutChange {
        let mut change = StrutChange::default();
        let bounds = monitors.geometry(monitor);
        let mut allocated: SmallVec<[usize; 8]> = SmallVec::new();

        for index in 0..self.struts.len() {
            if self.struts[index].screen != screen || self.struts[index].monitor != monitor {
                continue;
            }

            let orientation = self.struts[index].orientation;
            let mut geometry = self.struts[index].geometry;
            let mut moved_down = false;
            let mut skip = 0;

            while let Some(overlap) = self.intersect(&allocated, &geometry, skip) {
                skip = allocation_overlapped(orientation, overlap, &mut geometry, &mut moved_down, skip);
            }

            if orientation.is_vertical() {
                if geometry.y < bounds.y {
                    geometry.height = geometry.bottom() - bounds.y;
                    geometry.y = bounds.y;
                }
                if geometry.bottom() > bounds.bottom() {
                    geometry.height = bounds.bottom() - geometry.y;
                }
            }

            let strut = &mut self.struts[index];
            if strut.allocated_geometry != geometry {
                if strut.toplevel == toplevel {
                    change.toplevel_changed = true;
                } else {
                    change.others.push(strut.toplevel);
                }
            }

            strut.allocated_geometry = geometry;
            match orientation {
                Orientation::Top => {
                    strut.allocated_size = geometry.bottom() - bounds.y;
                    strut.allocated_start = geometry.x;
                    strut.allocated_end = geometry.right() - 1;
                }
                Orientation::Bottom => {
                    strut.allocated_size = bounds.bottom() - geometry.y;
                    strut.allocated_start = geometry.x;
                    strut.allocated_end = geometry.right() - 1;
                }
                Orientation::Left => {
                    strut.allocated_size = geometry.right() - bounds.x;
                    strut.allocated_start = geometry.y;
                    strut.allocated_end = geometry.bottom() - 1;
                }
                Orientation::Right => {
                    strut.allocated_size = bounds.right() - geometry.x;
                    strut.allocated_start = geometry.y;
                    strut.allocated_end = geometry.bottom() - 1;
                }
            }

            debug!(
                "Strut of toplevel {} on monitor {} allocated {:?} (size {})",
                strut.toplevel, monitor, geometry, strut.allocated_size
            );

            allocated.push(index);
        }

        change
    }

    /// The `skip`-th already allocated strut overlapping `geometry`
    fn intersect(&self, allocated: &[usize], geometry: &Rect, skip: usize) -> Option<&PanelStrut> {
        allocated
            .iter()
            .map(|&i| &self.struts[i])
            .filter(|strut| strut.allocated_geometry.intersects(geometry))
            .nth(skip)
    }

    /// Shift `geometry` by the difference between the allocated and desired
    /// rectangles of `toplevel`. Position only unless `include_size`.
    pub fn adjust_toplevel_geometry(&self, toplevel: ToplevelId, geometry: &mut Rect, include_size: bool) -> bool {
        let Some(strut) = self.find(toplevel) else {
            return false;
        };

        geometry.x += strut.allocated_geometry.x - strut.geometry.x;
        geometry.y += strut.allocated_geometry.y - strut.geometry.y;

        if include_size {
            geometry.width += strut.allocated_geometry.width - strut.geometry.width;
            geometry.height += strut.allocated_geometry.height - strut.geometry.height;
        }

        true
    }

    /// Strut value to publish for `toplevel`, or `None` to publish nothing.
    ///
    /// Struts of panels that are not on the rim of the virtual desktop are
    /// zero unless `pivot` is set, in which case they are re-expressed on a
    /// perpendicular rim edge the panel touches.
    pub fn window_hint(&self, monitors: &MonitorRegistry, toplevel: ToplevelId, pivot: bool) -> Option<WmStrut> {
        let strut = self.find(toplevel)?;
        let monitor = monitors.geometry(strut.monitor);
        let screen = monitors.screen();
        let extremes = monitors.is_at_visible_extreme(strut.monitor);

        let mut orientation = strut.orientation;
        let mut size = strut.allocated_size;
        let mut start = strut.allocated_start;
        let mut end = strut.allocated_end;

        let at_rim = match strut.orientation {
            Orientation::Top => {
                size += monitor.y - screen.y;
                extremes.topmost
            }
            Orientation::Bottom => {
                size += screen.bottom() - monitor.bottom();
                extremes.bottommost
            }
            Orientation::Left => {
                size += monitor.x - screen.x;
                extremes.leftmost
            }
            Orientation::Right => {
                size += screen.right() - monitor.right();
                extremes.rightmost
            }
        };

        if !at_rim {
            let pivoted = if pivot {
                pivot_strut(strut, monitor, screen, extremes)
            } else {
                None
            };

            match pivoted {
                Some((o, s, a, b)) => {
                    debug!("Pivoting strut of toplevel {} onto the {} edge", toplevel, o.as_str());
                    orientation = o;
                    size = s;
                    start = a;
                    end = b;
                }
                None => size = 0,
            }
        }

        let scale = strut.scale.max(1);
        Some(WmStrut {
            orientation,
            size: (size.max(0) * scale) as u32,
            start: (start.max(0) * scale) as u32,
            end: (end.max(0) * scale) as u32,
        })
    }
}

/// Re-express an inner-edge strut on a perpendicular edge of the desktop
/// rim, covering exactly the rows (or columns) of the panel.
fn pivot_strut(
    strut: &PanelStrut,
    monitor: Rect,
    screen: Rect,
    extremes: crate::monitor::VisibleExtremes,
) -> Option<(Orientation, i32, i32, i32)> {
    let g = strut.allocated_geometry;

    if strut.orientation.is_horizontal() {
        if extremes.leftmost && g.x == monitor.x {
            return Some((Orientation::Left, g.right() - screen.x, g.y, g.bottom() - 1));
        }
        if extremes.rightmost && g.right() == monitor.right() {
            return Some((Orientation::Right, screen.right() - g.x, g.y, g.bottom() - 1));
        }
    } else {
        if extremes.topmost && g.y == monitor.y {
            return Some((Orientation::Top, g.bottom() - screen.y, g.x, g.right() - 1));
        }
        if extremes.bottommost && g.bottom() == monitor.bottom() {
            return Some((Orientation::Bottom, screen.bottom() - g.y, g.x, g.right() - 1));
        }
    }

    None
}

/// Resolve one overlap against an earlier strut; returns the next skip count
fn allocation_overlapped(
    orientation: Orientation,
    overlap: &PanelStrut,
    geometry: &mut Rect,
    moved_down: &mut bool,
    skip: usize,
) -> usize {
    let o = overlap.allocated_geometry;

    if orientation == overlap.orientation {
        match orientation {
            Orientation::Top => geometry.y = o.bottom(),
            Orientation::Bottom => geometry.y = o.y - geometry.height,
            Orientation::Left => geometry.x = o.right(),
            Orientation::Right => geometry.x = o.x - geometry.width,
        }
        return skip;
    }

    if orientation.is_vertical() {
        match overlap.orientation {
            Orientation::Top if !*moved_down => {
                let bottom = geometry.bottom();
                geometry.y = o.bottom();
                geometry.height = bottom - geometry.y;
                *moved_down = true;
                return skip;
            }
            Orientation::Bottom => {
                geometry.height = o.y - geometry.y;
                return skip;
            }
            _ => {}
        }
    }

    skip + 1
}

fn compare_struts(a: &PanelStrut, b: &PanelStrut) -> Ordering {
    a.screen
        .cmp(&b.screen)
        .then(a.monitor.cmp(&b.monitor))
        .then(b.depth.cmp(&a.depth))
        .then(a.orientation.order().cmp(&b.orientation.order()))
        .then(a.start.cmp(&b.start))
        .then(b.end.cmp(&a.end))
}

fn merge_others(change: &mut StrutChange, others: SmallVec<[ToplevelId; 4]>) {
    for id in others {
        if !change.others.contains(&id) {
            change.others.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Monitor;

    fn single_monitor() -> MonitorRegistry {
        MonitorRegistry::with_monitors(vec![Monitor::new(Rect::new(0, 0, 1920, 1080))])
    }

    fn request(id: u32, orientation: Orientation, size: i32, start: i32, end: i32) -> StrutRequest {
        StrutRequest {
            toplevel: ToplevelId(id),
            screen: 0,
            monitor: 0,
            orientation,
            size,
            start,
            end,
            scale: 1,
            depth: 0,
        }
    }

    #[test]
    fn test_identical_registration_is_noop() {
        let monitors = single_monitor();
        let mut struts = StrutRegistry::new();

        let first = struts.register_strut(&monitors, request(1, Orientation::Top, 24, 0, 1919));
        assert!(first.toplevel_changed);

        let second = struts.register_strut(&monitors, request(1, Orientation::Top, 24, 0, 1919));
        assert_eq!(second, StrutChange::default());
    }

    #[test]
    fn test_bottom_strut_desired_geometry() {
        let monitors = single_monitor();
        let mut struts = StrutRegistry::new();
        struts.register_strut(&monitors, request(1, Orientation::Bottom, 30, 100, 599));

        let strut = struts.find(ToplevelId(1)).unwrap();
        assert_eq!(strut.geometry, Rect::new(100, 1050, 500, 30));
        assert_eq!(strut.allocated_size, 30);
        assert_eq!((strut.allocated_start, strut.allocated_end), (100, 599));
    }

    #[test]
    fn test_left_panel_moves_below_top_panel() {
        let monitors = single_monitor();
        let mut struts = StrutRegistry::new();
        struts.register_strut(&monitors, request(1, Orientation::Top, 24, 0, 1919));
        struts.register_strut(&monitors, request(2, Orientation::Left, 48, 0, 1079));

        let left = struts.find(ToplevelId(2)).unwrap();
        assert_eq!(left.allocated_geometry, Rect::new(0, 24, 48, 1056));
    }

    #[test]
    fn test_left_panel_stops_above_bottom_panel() {
        let monitors = single_monitor();
        let mut struts = StrutRegistry::new();
        struts.register_strut(&monitors, request(1, Orientation::Bottom, 24, 0, 1919));
        struts.register_strut(&monitors, request(2, Orientation::Left, 48, 0, 1079));

        let left = struts.find(ToplevelId(2)).unwrap();
        assert_eq!(left.allocated_geometry, Rect::new(0, 0, 48, 1056));
        assert_eq!(left.allocated_end, 1055);
    }

    #[test]
    fn test_unregister_releases_space() {
        let monitors = single_monitor();
        let mut struts = StrutRegistry::new();
        struts.register_strut(&monitors, request(1, Orientation::Top, 24, 0, 1919));
        struts.register_strut(&monitors, request(2, Orientation::Top, 24, 0, 1919));
        assert_eq!(struts.find(ToplevelId(2)).unwrap().allocated_geometry.y, 24);

        let change = struts.unregister_strut(&monitors, ToplevelId(1));
        assert_eq!(change.others.as_slice(), &[ToplevelId(2)]);
        assert_eq!(struts.find(ToplevelId(2)).unwrap().allocated_geometry.y, 0);
    }

    #[test]
    fn test_adjust_geometry_applies_offset() {
        let monitors = single_monitor();
        let mut struts = StrutRegistry::new();
        struts.register_strut(&monitors, request(1, Orientation::Top, 24, 0, 1919));
        struts.register_strut(&monitors, request(2, Orientation::Top, 24, 0, 1919));

        let mut geometry = Rect::new(0, 0, 1920, 24);
        assert!(struts.adjust_toplevel_geometry(ToplevelId(2), &mut geometry, true));
        assert_eq!(geometry, Rect::new(0, 24, 1920, 24));
        assert!(!struts.adjust_toplevel_geometry(ToplevelId(9), &mut geometry, true));
    }

    #[test]
    fn test_partial_strut_layout() {
        let strut = WmStrut {
            orientation: Orientation::Bottom,
            size: 24,
            start: 0,
            end: 1919,
        };
        assert_eq!(strut.partial(), [0, 0, 0, 24, 0, 0, 0, 0, 0, 0, 0, 1919]);
        assert_eq!(strut.legacy(), [0, 0, 0, 24]);

        let left = WmStrut {
            orientation: Orientation::Left,
            size: 48,
            start: 24,
            end: 1079,
        };
        assert_eq!(left.partial(), [48, 0, 0, 0, 24, 1079, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_inner_edge_strut_is_zero_without_pivot() {
        // Bottom panel on the upper of two stacked monitors
        let monitors = MonitorRegistry::with_monitors(vec![
            Monitor::new(Rect::new(0, 0, 1920, 1080)),
            Monitor::new(Rect::new(0, 1080, 1920, 1080)),
        ]);
        let mut struts = StrutRegistry::new();
        struts.register_strut(&monitors, request(1, Orientation::Bottom, 24, 0, 1919));

        let hint = struts.window_hint(&monitors, ToplevelId(1), false).unwrap();
        assert_eq!(hint.size, 0);

        let pivoted = struts.window_hint(&monitors, ToplevelId(1), true).unwrap();
        assert_eq!(pivoted.orientation, Orientation::Left);
        assert_eq!(pivoted.size, 1920);
        assert_eq!((pivoted.start, pivoted.end), (1056, 1079));
    }

    #[test]
    fn test_window_hint_extends_to_screen_edge_and_scales() {
        let monitors = MonitorRegistry::with_monitors(vec![
            Monitor::new(Rect::new(0, 0, 1920, 1200)).with_scale(2),
            Monitor::new(Rect::new(1920, 0, 1280, 1024)),
        ]);
        let mut struts = StrutRegistry::new();
        let mut req = request(1, Orientation::Bottom, 24, 1920, 3199);
        req.monitor = 1;
        struts.register_strut(&monitors, req);

        let hint = struts.window_hint(&monitors, ToplevelId(1), false).unwrap();
        assert_eq!(hint.size, 24 + (1200 - 1024));

        let mut scaled = request(2, Orientation::Top, 24, 0, 1919);
        scaled.scale = 2;
        struts.register_strut(&monitors, scaled);
        let hint = struts.window_hint(&monitors, ToplevelId(2), false).unwrap();
        assert_eq!((hint.size, hint.start, hint.end), (48, 0, 3838));
    }
}
