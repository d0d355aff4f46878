//! Monitor inventory
//!
//! Keeps the ordered list of monitor rectangles the panels are placed on.
//! The list is rebuilt wholesale on every display change; consumers query by
//! index each time they need geometry.

mod source;
#[cfg(feature = "x11")]
mod randr;

pub use source::{MonitorSource, SharedMonitorSource, StaticMonitorSource};
#[cfg(feature = "x11")]
pub use randr::RandrMonitorSource;

use compact_str::CompactString;
use tracing::{debug, info, warn};

use crate::geometry::{Point, Rect};

/// Used when every source fails, so that index 0 always exists
pub const FALLBACK_MONITOR: Rect = Rect::new(0, 0, 1024, 768);

/// One physical output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub geometry: Rect,
    pub scale: i32,
    pub connector: Option<CompactString>,
}

impl Monitor {
    pub fn new(geometry: Rect) -> Self {
        Self {
            geometry,
            scale: 1,
            connector: None,
        }
    }

    pub fn with_scale(mut self, scale: i32) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn with_connector(mut self, connector: impl Into<CompactString>) -> Self {
        self.connector = Some(connector.into());
        self
    }
}

/// Whether a monitor sits on each rim of the virtual desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleExtremes {
    pub leftmost: bool,
    pub rightmost: bool,
    pub topmost: bool,
    pub bottommost: bool,
}

/// Process-wide monitor inventory
pub struct MonitorRegistry {
    monitors: Vec<Monitor>,
    sources: Vec<Box<dyn MonitorSource>>,
    initialized: bool,
}

impl MonitorRegistry {
    /// Create a registry that enumerates through `sources`, best first
    pub fn new(sources: Vec<Box<dyn MonitorSource>>) -> Self {
        Self {
            monitors: Vec::new(),
            sources,
            initialized: false,
        }
    }

    /// Registry over a fixed list, already initialized
    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        let mut registry = Self::new(vec![Box::new(StaticMonitorSource::new(monitors))]);
        registry.init();
        registry
    }

    /// Populate the list once. Later calls are no-ops.
    pub fn init(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        self.rebuild();
        true
    }

    /// Rebuild the whole list after a display change.
    ///
    /// Callers must re-run geometry for every toplevel afterwards.
    pub fn reinit(&mut self) {
        self.initialized = true;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let mut monitors = None;

        for source in &mut self.sources {
            match source.enumerate() {
                Ok(Some(list)) if !list.is_empty() => {
                    debug!("Monitor source {} returned {} outputs", source.name(), list.len());
                    monitors = Some(list);
                    break;
                }
                Ok(_) => {
                    debug!("Monitor source {} returned nothing useful", source.name());
                }
                Err(e) => {
                    warn!("Monitor source {} failed: {}", source.name(), e);
                }
            }
        }

        let mut monitors = monitors.unwrap_or_else(|| {
            warn!("No monitor source produced monitors, using fallback geometry");
            vec![Monitor::new(FALLBACK_MONITOR)]
        });

        compress_overlapping(&mut monitors);

        info!("Monitor inventory rebuilt: {} monitor(s)", monitors.len());
        for (i, monitor) in monitors.iter().enumerate() {
            debug!(
                "  monitor {}: {:?} scale={} connector={:?}",
                i, monitor.geometry, monitor.scale, monitor.connector
            );
        }

        self.monitors = monitors;
    }

    pub fn count(&self) -> usize {
        self.monitors.len()
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn get(&self, index: usize) -> Option<&Monitor> {
        self.monitors.get(index)
    }

    /// Geometry of monitor `index`; out-of-range indices fall back to monitor 0
    pub fn geometry(&self, index: usize) -> Rect {
        debug_assert!(!self.monitors.is_empty(), "monitor list queried before init");
        self.monitors
            .get(index)
            .or_else(|| self.monitors.first())
            .map(|m| m.geometry)
            .unwrap_or(FALLBACK_MONITOR)
    }

    pub fn x(&self, index: usize) -> i32 {
        self.geometry(index).x
    }

    pub fn y(&self, index: usize) -> i32 {
        self.geometry(index).y
    }

    pub fn width(&self, index: usize) -> i32 {
        self.geometry(index).width
    }

    pub fn height(&self, index: usize) -> i32 {
        self.geometry(index).height
    }

    pub fn scale(&self, index: usize) -> i32 {
        self.monitors.get(index).map(|m| m.scale).unwrap_or(1)
    }

    /// Monitor containing the point, or the nearest one when it lies outside
    /// every monitor
    pub fn monitor_at_point(&self, x: i32, y: i32) -> usize {
        debug_assert!(!self.monitors.is_empty(), "monitor list queried before init");

        let mut closest = 0;
        let mut min_dist_squared = i64::MAX;

        for (i, monitor) in self.monitors.iter().enumerate() {
            let geometry = &monitor.geometry;
            let dist_x = i64::from(axis_distance(x, geometry.x, geometry.width));
            let dist_y = i64::from(axis_distance(y, geometry.y, geometry.height));

            if dist_x == 0 && dist_y == 0 {
                return i;
            }

            let dist_squared = dist_x * dist_x + dist_y * dist_y;
            if dist_squared < min_dist_squared {
                min_dist_squared = dist_squared;
                closest = i;
            }
        }

        closest
    }

    /// Which rims of the virtual desktop monitor `index` lies on
    pub fn is_at_visible_extreme(&self, index: usize) -> VisibleExtremes {
        let mut extremes = VisibleExtremes {
            leftmost: true,
            rightmost: true,
            topmost: true,
            bottommost: true,
        };

        let Some(monitor) = self.monitors.get(index) else {
            debug_assert!(false, "monitor {} out of range", index);
            return extremes;
        };
        let m = monitor.geometry;

        for (i, other) in self.monitors.iter().enumerate() {
            if i == index {
                continue;
            }
            let o = other.geometry;

            let shares_rows = (o.y >= m.y && o.y < m.bottom())
                || (o.bottom() > m.y && o.bottom() <= m.bottom());
            if shares_rows {
                if o.x < m.x {
                    extremes.leftmost = false;
                }
                if o.right() > m.right() {
                    extremes.rightmost = false;
                }
            }

            let shares_columns = (o.x >= m.x && o.x < m.right())
                || (o.right() > m.x && o.right() <= m.right());
            if shares_columns {
                if o.y < m.y {
                    extremes.topmost = false;
                }
                if o.bottom() > m.bottom() {
                    extremes.bottommost = false;
                }
            }
        }

        extremes
    }

    /// Bounding box of all monitors as (min, max) corners
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(i32::MAX, i32::MAX);
        let mut max = Point::new(i32::MIN, i32::MIN);

        for monitor in &self.monitors {
            let g = monitor.geometry;
            min.x = min.x.min(g.x);
            min.y = min.y.min(g.y);
            max.x = max.x.max(g.right());
            max.y = max.y.max(g.bottom());
        }

        if self.monitors.is_empty() {
            return (Point::default(), Point::default());
        }
        (min, max)
    }

    /// Bounding box of all monitors as a rectangle
    pub fn screen(&self) -> Rect {
        let (min, max) = self.bounds();
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

/// Distance from `p` to the span `[start, start + size)`, zero inside it
fn axis_distance(p: i32, start: i32, size: i32) -> i32 {
    if p >= start && p < start + size {
        0
    } else if p < start {
        start - p
    } else {
        p - (start + size - 1)
    }
}

/// Merge overlapping outputs, keeping the larger one of each overlapping pair.
///
/// Mirrored outputs show up as overlapping rectangles; anchoring a panel to
/// the smaller one would leave it floating on the larger.
pub fn compress_overlapping(monitors: &mut Vec<Monitor>) {
    let mut i = 0;
    while i < monitors.len() {
        let mut j = i + 1;
        while j < monitors.len() {
            if monitors[i].geometry.intersects(&monitors[j].geometry) {
                let removed = monitors.remove(j);
                if removed.geometry.area() > monitors[i].geometry.area() {
                    monitors[i] = removed;
                    // The survivor grew; earlier pairs must be checked again
                    j = i + 1;
                }
            } else {
                j += 1;
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(x: i32, y: i32, w: i32, h: i32) -> Monitor {
        Monitor::new(Rect::new(x, y, w, h))
    }

    #[test]
    fn test_compress_keeps_larger_mirror() {
        let mut monitors = vec![monitor(0, 0, 1024, 768), monitor(0, 0, 1920, 1080)];
        compress_overlapping(&mut monitors);
        assert_eq!(monitors, vec![monitor(0, 0, 1920, 1080)]);
    }

    #[test]
    fn test_compress_handles_chains() {
        // a overlaps b, b overlaps c, but a does not overlap c
        let mut monitors = vec![
            monitor(0, 0, 100, 100),
            monitor(50, 0, 200, 100),
            monitor(240, 0, 400, 100),
            monitor(2000, 0, 100, 100),
        ];
        compress_overlapping(&mut monitors);

        for (i, a) in monitors.iter().enumerate() {
            for b in monitors.iter().skip(i + 1) {
                assert!(!a.geometry.intersects(&b.geometry));
            }
        }
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[0].geometry, Rect::new(240, 0, 400, 100));
        assert_eq!(monitors[1].geometry, Rect::new(2000, 0, 100, 100));
    }

    #[test]
    fn test_compress_leaves_side_by_side_monitors() {
        let mut monitors = vec![monitor(0, 0, 1920, 1080), monitor(1920, 0, 1280, 1024)];
        compress_overlapping(&mut monitors);
        assert_eq!(monitors.len(), 2);
    }

    #[test]
    fn test_monitor_at_point_centers() {
        let registry = MonitorRegistry::with_monitors(vec![
            monitor(0, 0, 1920, 1080),
            monitor(1920, 0, 1280, 1024),
            monitor(0, 1080, 800, 600),
        ]);

        for i in 0..registry.count() {
            let center = registry.geometry(i).center();
            assert_eq!(registry.monitor_at_point(center.x, center.y), i);
        }
    }

    #[test]
    fn test_monitor_at_point_outside_picks_nearest() {
        let registry = MonitorRegistry::with_monitors(vec![
            monitor(0, 0, 1920, 1080),
            monitor(1920, 0, 1280, 1024),
        ]);

        // In the dead area below the shorter right monitor
        assert_eq!(registry.monitor_at_point(3000, 1060), 1);
        assert_eq!(registry.monitor_at_point(-50, 500), 0);
        assert_eq!(registry.monitor_at_point(5000, -5000), 1);
    }

    #[test]
    fn test_visible_extremes_side_by_side() {
        let registry = MonitorRegistry::with_monitors(vec![
            monitor(0, 0, 1920, 1080),
            monitor(1920, 0, 1920, 1080),
        ]);

        let left = registry.is_at_visible_extreme(0);
        assert!(left.leftmost && !left.rightmost && left.topmost && left.bottommost);

        let right = registry.is_at_visible_extreme(1);
        assert!(!right.leftmost && right.rightmost);
    }

    #[test]
    fn test_visible_extremes_stacked() {
        let registry = MonitorRegistry::with_monitors(vec![
            monitor(0, 0, 1920, 1080),
            monitor(0, 1080, 1920, 1080),
        ]);

        assert!(!registry.is_at_visible_extreme(0).bottommost);
        assert!(!registry.is_at_visible_extreme(1).topmost);
        assert!(registry.is_at_visible_extreme(1).leftmost);
    }

    #[test]
    fn test_bounds_union() {
        let registry = MonitorRegistry::with_monitors(vec![
            monitor(0, 100, 1920, 1080),
            monitor(1920, 0, 1280, 1024),
        ]);
        let (min, max) = registry.bounds();
        assert_eq!(min, Point::new(0, 0));
        assert_eq!(max, Point::new(3200, 1180));
    }

    #[test]
    fn test_falls_back_to_next_source() {
        let empty = StaticMonitorSource::default();
        let real = StaticMonitorSource::new(vec![monitor(0, 0, 800, 600)]);
        let mut registry = MonitorRegistry::new(vec![Box::new(empty), Box::new(real)]);

        assert!(registry.init());
        assert!(!registry.init());
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.width(0), 800);
    }

    #[test]
    fn test_reinit_picks_up_hotplug() {
        let source = SharedMonitorSource::new(vec![monitor(0, 0, 1920, 1080)]);
        let mut registry = MonitorRegistry::new(vec![Box::new(source.clone())]);
        registry.init();
        assert_eq!(registry.count(), 1);

        source.set_monitors(vec![monitor(0, 0, 1920, 1080), monitor(1920, 0, 1920, 1080)]);
        registry.reinit();
        assert_eq!(registry.count(), 2);
    }
}
