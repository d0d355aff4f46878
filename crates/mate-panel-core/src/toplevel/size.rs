use smallvec::SmallVec;

use crate::config::{HANDLE_SIZE, MAXIMUM_SIZE_SCREEN_RATIO, MINIMUM_WIDTH};
use crate::geometry::Rect;

use super::state::Toplevel;

/// What the panel contents ask for, reported by the widget layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRequest {
    /// Length needed by applets without size hints
    pub length: i32,
    /// Thickness the contents would like
    pub thickness: i32,
    /// Smallest usable thickness, from font metrics
    pub minimum_thickness: i32,
    /// Per applet, the ascending list of lengths it accepts
    pub applet_sizes: Vec<SmallVec<[i32; 4]>>,
}

/// Hand out the room left below `limit` to applets with discrete size hints.
///
/// Every applet starts at its smallest accepted size. Passes then go
/// round-robin, moving each applet to its next accepted size while that
/// still fits, until a pass makes no progress. Returns the total length
/// and the size picked for each applet.
pub fn distribute_applet_hints(applet_sizes: &[SmallVec<[i32; 4]>], base: i32, limit: i32) -> (i32, Vec<i32>) {
    let mut steps = vec![0usize; applet_sizes.len()];
    let mut allocations: Vec<i32> = applet_sizes
        .iter()
        .map(|sizes| sizes.first().copied().unwrap_or(0))
        .collect();

    let mut total = base + allocations.iter().sum::<i32>();
    if total >= limit {
        return (total.min(limit), allocations);
    }

    loop {
        let mut progressed = false;

        for (i, sizes) in applet_sizes.iter().enumerate() {
            let Some(&next) = sizes.get(steps[i] + 1) else {
                continue;
            };

            let grow = next - allocations[i];
            if total + grow <= limit {
                total += grow;
                allocations[i] = next;
                steps[i] += 1;
                progressed = true;
            }
        }

        if !progressed {
            break;
        }
    }

    (total, allocations)
}

/// Window size of `toplevel` on `monitor` when fully shown.
///
/// Returns `(width, height, applet allocations)`.
pub(crate) fn compute_size(toplevel: &Toplevel, monitor: Rect) -> (i32, i32, Vec<i32>) {
    let content = &toplevel.content;
    let horizontal = toplevel.orientation.is_horizontal();

    let (monitor_length, monitor_thickness) = if horizontal {
        (monitor.width, monitor.height)
    } else {
        (monitor.height, monitor.width)
    };

    let maximum_thickness = monitor_thickness / MAXIMUM_SIZE_SCREEN_RATIO;
    let thickness = content
        .thickness
        .max(toplevel.size)
        .min(maximum_thickness)
        .max(content.minimum_thickness);

    let mut allocations = Vec::new();
    let length = if toplevel.expand {
        monitor_length
    } else {
        let mut extra = 0;
        if toplevel.buttons_enabled {
            extra += 2 * toplevel.hide_button_size;
        } else if !toplevel.is_attached() {
            extra += HANDLE_SIZE;
        }

        let (length, picked) = distribute_applet_hints(&content.applet_sizes, content.length + extra, monitor_length);
        allocations = picked;

        if toplevel.is_attached() {
            length
        } else {
            length.max(MINIMUM_WIDTH)
        }
    };

    let (width, height) = if horizontal {
        (length, thickness)
    } else {
        (thickness, length)
    };

    (
        width.clamp(0, monitor.width),
        height.clamp(0, monitor.height),
        allocations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToplevelConfig;
    use crate::geometry::Orientation;
    use crate::toplevel::ToplevelId;
    use smallvec::smallvec;

    fn toplevel(orientation: Orientation, expand: bool) -> Toplevel {
        let mut config = ToplevelConfig::new("p");
        config.orientation = orientation;
        config.expand = expand;
        Toplevel::from_config(ToplevelId(1), &config)
    }

    #[test]
    fn test_distribute_never_picks_unlisted_sizes() {
        let hints: Vec<SmallVec<[i32; 4]>> = vec![smallvec![50, 100, 200], smallvec![30, 60]];
        let (total, picked) = distribute_applet_hints(&hints, 0, 250);

        assert_eq!(picked, vec![100, 60]);
        assert_eq!(total, 160);
        for (size, sizes) in picked.iter().zip(&hints) {
            assert!(sizes.contains(size));
        }
    }

    #[test]
    fn test_distribute_round_robin_until_full() {
        let hints: Vec<SmallVec<[i32; 4]>> = vec![smallvec![10, 20, 30, 40], smallvec![10, 20, 30, 40]];
        let (total, picked) = distribute_applet_hints(&hints, 5, 75);
        assert_eq!(picked, vec![40, 30]);
        assert_eq!(total, 75);
    }

    #[test]
    fn test_distribute_clamps_when_minimums_overflow() {
        let hints: Vec<SmallVec<[i32; 4]>> = vec![smallvec![300]];
        let (total, picked) = distribute_applet_hints(&hints, 100, 250);
        assert_eq!(total, 250);
        assert_eq!(picked, vec![300]);
    }

    #[test]
    fn test_expanded_panel_spans_monitor() {
        let panel = toplevel(Orientation::Bottom, true);
        let (w, h, _) = compute_size(&panel, Rect::new(0, 0, 1920, 1080));
        assert_eq!((w, h), (1920, 24));
    }

    #[test]
    fn test_thickness_capped_at_fifth_of_monitor() {
        let mut panel = toplevel(Orientation::Left, true);
        panel.size = 500;
        let (w, h, _) = compute_size(&panel, Rect::new(0, 0, 1280, 800));
        assert_eq!((w, h), (256, 800));
    }

    #[test]
    fn test_floating_panel_gets_handle_and_minimum() {
        let mut panel = toplevel(Orientation::Top, false);
        panel.content.length = 20;
        let (w, _, _) = compute_size(&panel, Rect::new(0, 0, 1920, 1080));
        assert_eq!(w, MINIMUM_WIDTH);

        panel.content.length = 300;
        let (w, _, _) = compute_size(&panel, Rect::new(0, 0, 1920, 1080));
        assert_eq!(w, 300 + HANDLE_SIZE);

        panel.buttons_enabled = true;
        let (w, _, _) = compute_size(&panel, Rect::new(0, 0, 1920, 1080));
        assert_eq!(w, 300 + 2 * panel.hide_button_size);
    }
}
