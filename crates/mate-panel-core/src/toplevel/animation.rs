use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ANIMATION_TICK_MS;
use crate::geometry::Rect;
use crate::messages::ToplevelEvent;

use super::manager::PanelManager;
use super::state::{Animation, ToplevelState};
use super::ToplevelId;

/// Eased step from `src` toward `dest` at time `now` of an animation
/// running from `start` to `end`.
///
/// The progress goes through the cubic `p(x) = -2x²(x - 1.5)` twice for a
/// stronger ease-in/ease-out. Past `end`, or when within a pixel, the full
/// remaining distance is returned.
pub fn get_delta(src: i32, dest: i32, start: Instant, end: Instant, now: Instant) -> i32 {
    let distance = dest - src;
    if distance.abs() <= 1 || now >= end {
        return distance;
    }

    let total = end.saturating_duration_since(start).as_secs_f64();
    if total <= 0.0 {
        return distance;
    }

    let mut x = now.saturating_duration_since(start).as_secs_f64() / total;
    x = -2.0 * x * x * (x - 1.5);
    x = -2.0 * x * x * (x - 1.5);
    let progress = x.clamp(0.0, 1.0);

    (f64::from(distance) * progress) as i32
}

/// Widen a position step to the size step, so the growing edge stays put,
/// without running past the target
fn follow_size(delta: i32, size_delta: i32, remaining: i32) -> i32 {
    if delta == 0 || size_delta.abs() <= delta.abs() {
        return delta;
    }
    let widened = size_delta.abs() * delta.signum();
    if widened.abs() > remaining.abs() {
        remaining
    } else {
        widened
    }
}

impl PanelManager {
    /// Start moving toward the geometry of the current state.
    ///
    /// The end geometry is computed up front, which also registers the
    /// end-state strut. Returns false when already there.
    pub(super) fn start_animation(&mut self, id: ToplevelId) -> bool {
        self.update_monitor(id);
        self.update_size(id);

        let Some(state) = self.toplevels.get(&id).map(|t| t.state) else {
            return false;
        };
        let Some(target) = self.target_rect(id, state) else {
            return false;
        };

        let now = self.now();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        let monitor = self.monitors.geometry(t.monitor);
        if t.geometry.translated(-monitor.x, -monitor.y) == target {
            return false;
        }

        t.animation = Some(Animation {
            start: now,
            end: now + t.animation_speed.duration(),
            target,
        });
        t.animation_tick = Some(now + Duration::from_millis(ANIMATION_TICK_MS));
        if t.is_attached() {
            t.mapped = true;
        }
        t.dirty = true;

        debug!(
            "Animating toplevel {} to {}x{}+{}+{}",
            id, target.width, target.height, target.x, target.y
        );
        true
    }

    /// Advance the running animation to the current time
    pub(super) fn step_animation(&mut self, id: ToplevelId) {
        let now = self.now();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        let Some(animation) = t.animation else {
            return;
        };

        let monitor = self.monitors.geometry(t.monitor);
        let current = t.geometry.translated(-monitor.x, -monitor.y);
        let target = animation.target;
        let delta = |src, dest| get_delta(src, dest, animation.start, animation.end, now);

        let dw = delta(current.width, target.width);
        let dh = delta(current.height, target.height);
        let dx = follow_size(delta(current.x, target.x), dw, target.x - current.x);
        let dy = follow_size(delta(current.y, target.y), dh, target.y - current.y);

        let next = Rect::new(
            current.x + dx,
            current.y + dy,
            current.width + dw,
            current.height + dh,
        );
        t.geometry = next.translated(monitor.x, monitor.y);

        if next == target {
            self.finish_animation(id);
        }
    }

    fn finish_animation(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        t.animation = None;
        t.animation_tick = None;
        t.initial_animation_done = true;
        t.dirty = true;

        let state = t.state;
        if t.is_attached() && state != ToplevelState::Normal {
            t.mapped = false;
        }

        debug!("Toplevel {} finished animating", id);

        if state == ToplevelState::Normal {
            self.emit(id, ToplevelEvent::Unhiding);
            self.unhide_children(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> (Instant, Instant) {
        let start = Instant::now();
        (start, start + Duration::from_millis(400))
    }

    #[test]
    fn test_delta_endpoints() {
        let (start, end) = window();
        assert_eq!(get_delta(0, 100, start, end, start), 0);
        assert_eq!(get_delta(0, 100, start, end, end), 100);
        assert_eq!(get_delta(0, 100, start, end, end + Duration::from_secs(1)), 100);
    }

    #[test]
    fn test_delta_is_symmetric_at_midpoint() {
        let (start, end) = window();
        let mid = start + Duration::from_millis(200);
        assert_eq!(get_delta(0, 100, start, end, mid), 50);
        assert_eq!(get_delta(100, 0, start, end, mid), -50);
    }

    #[test]
    fn test_delta_eases_in() {
        let (start, end) = window();
        let early = get_delta(0, 1000, start, end, start + Duration::from_millis(40));
        let late = get_delta(0, 1000, start, end, start + Duration::from_millis(360));
        assert!(early < 100);
        assert!(late > 900);
    }

    #[test]
    fn test_small_distances_jump() {
        let (start, end) = window();
        assert_eq!(get_delta(10, 11, start, end, start), 1);
        assert_eq!(get_delta(10, 9, start, end, start), -1);
    }

    #[test]
    fn test_follow_size_never_overshoots() {
        assert_eq!(follow_size(2, -10, 23), 10);
        assert_eq!(follow_size(2, -10, 5), 5);
        assert_eq!(follow_size(-3, 8, -20), -8);
        assert_eq!(follow_size(0, 8, 0), 0);
        assert_eq!(follow_size(9, 4, 20), 9);
    }
}
