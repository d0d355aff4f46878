//! Hide/unhide transitions and the auto-hide timers

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ANIMATION_TICK_MS;
use crate::messages::ToplevelEvent;

use super::manager::PanelManager;
use super::state::ToplevelState;
use super::ToplevelId;

impl PanelManager {
    /// Retract a shown panel.
    ///
    /// `auto_hide` retracts to the auto-hide sliver; otherwise the panel
    /// slides toward `direction`, which must be a hidden state compatible
    /// with the orientation (`None` picks the docked edge).
    pub fn hide(&mut self, id: ToplevelId, auto_hide: bool, direction: Option<ToplevelState>) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };
        if t.state != ToplevelState::Normal {
            return;
        }

        let state = if auto_hide {
            ToplevelState::AutoHidden
        } else {
            let direction = direction.unwrap_or(ToplevelState::default_hidden(t.orientation));
            let valid = direction.is_hidden() && direction.fits(t.orientation);
            debug_assert!(valid, "{:?} does not fit a {} panel", direction, t.orientation.as_str());
            if !valid {
                warn!("Ignoring hide of toplevel {} toward {:?}", id, direction);
                return;
            }
            direction
        };

        debug!("Hiding toplevel {} ({:?})", id, state);
        self.emit(id, ToplevelEvent::Hiding);

        let parent = self.toplevels.get(&id).and_then(|t| t.attached_to());
        if let Some(parent) = parent {
            self.pop_autohide_disabler(parent);
        }

        if let Some(t) = self.toplevels.get_mut(&id) {
            t.state = state;
            t.dirty = true;
        }

        for child in self.children_of(id) {
            if self.toplevels.get(&child).is_some_and(|c| c.state == ToplevelState::Normal) {
                self.hide(child, false, None);
                if let Some(c) = self.toplevels.get_mut(&child) {
                    c.hidden_by_parent = true;
                }
            }
        }

        let animated = self.can_animate(id) && self.start_animation(id);
        if !animated {
            if let Some(t) = self.toplevels.get_mut(&id) {
                if t.is_attached() {
                    t.mapped = false;
                }
            }
        }
    }

    /// Bring a retracted panel back
    pub fn unhide(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        if t.state == ToplevelState::Normal {
            return;
        }

        debug!("Unhiding toplevel {} from {:?}", id, t.state);
        t.state = ToplevelState::Normal;
        t.dirty = true;

        let attachment = t.attachment.as_ref().map(|a| (a.parent, a.widget_mapped));
        if let Some((parent, widget_mapped)) = attachment {
            t.mapped = widget_mapped;
            self.push_autohide_disabler(parent);
        }

        let animated = self.can_animate(id) && self.start_animation(id);
        if !animated {
            self.emit(id, ToplevelEvent::Unhiding);
            self.unhide_children(id);
        }
    }

    /// Unhide drawers that were retracted along with `id`
    pub(super) fn unhide_children(&mut self, id: ToplevelId) {
        for child in self.children_of(id) {
            let Some(c) = self.toplevels.get_mut(&child) else {
                continue;
            };
            if c.hidden_by_parent {
                c.hidden_by_parent = false;
                self.unhide(child);
            }
        }
    }

    fn can_animate(&self, id: ToplevelId) -> bool {
        self.toplevels.get(&id).is_some_and(|t| t.animate && t.realized)
    }

    /// Arm the hide timer of an auto-hide panel the pointer left
    pub fn queue_auto_hide(&mut self, id: ToplevelId) {
        let now = self.now();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        if !t.auto_hide || t.pointer_inside || t.autohide_disablers > 0 {
            return;
        }

        t.unhide_deadline = None;
        if t.hide_deadline.is_some() || t.state != ToplevelState::Normal {
            return;
        }
        t.hide_deadline = Some(now + Duration::from_millis(u64::from(t.hide_delay)));
    }

    /// Arm the unhide timer of an auto-hidden panel
    pub fn queue_auto_unhide(&mut self, id: ToplevelId) {
        let now = self.now();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };

        t.hide_deadline = None;
        if t.unhide_deadline.is_some() || t.state != ToplevelState::AutoHidden {
            return;
        }
        t.unhide_deadline = Some(now + Duration::from_millis(u64::from(t.unhide_delay)));
    }

    /// Arm the one-time reveal of a freshly created panel
    pub fn queue_initial_unhide(&mut self, id: ToplevelId) {
        let now = self.now();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        if t.initial_animation_done || t.unhide_deadline.is_some() {
            return;
        }
        t.unhide_deadline = Some(now);
    }

    pub(super) fn hide_timeout(&mut self, id: ToplevelId) {
        let now = self.now();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };

        if t.autohide_disablers > 0 || t.grab.is_some() {
            return;
        }

        if t.animation.is_some() {
            let delay = u64::from(t.hide_delay).max(ANIMATION_TICK_MS);
            t.hide_deadline = Some(now + Duration::from_millis(delay));
            return;
        }

        self.hide(id, true, None);
    }

    pub(super) fn unhide_timeout(&mut self, id: ToplevelId) {
        let now = self.now();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };

        if t.animation.is_some() {
            let delay = u64::from(t.unhide_delay).max(ANIMATION_TICK_MS);
            t.unhide_deadline = Some(now + Duration::from_millis(delay));
            return;
        }

        if !t.animate {
            t.initial_animation_done = true;
        }

        // An auto-hide panel shows once at startup to settle its size
        if !t.initial_animation_done && t.auto_hide {
            self.unhide(id);
            self.hide(id, true, None);
            self.settle_initial_reveal(id);
            return;
        }

        if t.auto_hide && !t.pointer_inside {
            return;
        }

        self.unhide(id);
        self.settle_initial_reveal(id);
    }

    /// A reveal that could not animate still counts as done
    fn settle_initial_reveal(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            if t.animation.is_none() {
                t.initial_animation_done = true;
            }
        }
    }

    /// Keep the panel shown until the matching pop
    pub fn push_autohide_disabler(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            t.autohide_disablers += 1;
            t.hide_deadline = None;
        }
    }

    pub fn pop_autohide_disabler(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        debug_assert!(t.autohide_disablers > 0, "unbalanced autohide disabler on {}", id);
        if t.autohide_disablers == 0 {
            warn!("Unbalanced autohide disabler pop on toplevel {}", id);
            return;
        }

        t.autohide_disablers -= 1;
        if t.autohide_disablers == 0 {
            self.queue_auto_hide(id);
        }
    }

    // =========== Input ===========

    pub fn pointer_enter(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            t.pointer_inside = true;
            self.queue_auto_unhide(id);
        }
    }

    pub fn pointer_leave(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            t.pointer_inside = false;
            self.queue_auto_hide(id);
        }
    }

    pub fn focus_in(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        t.has_focus = true;
        if t.state == ToplevelState::AutoHidden {
            self.unhide(id);
        }
    }

    pub fn focus_out(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            t.has_focus = false;
            self.queue_auto_hide(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::clock::ManualClock;
    use crate::config::{EngineSettings, ToplevelConfig};
    use crate::geometry::{Orientation, Rect};
    use crate::monitor::{Monitor, MonitorRegistry};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn manager(clock: &ManualClock) -> PanelManager {
        let monitors = MonitorRegistry::with_monitors(vec![Monitor::new(Rect::new(0, 0, 1920, 1080))]);
        PanelManager::new(
            monitors,
            Box::new(RecordingBackend::new()),
            Box::new(clock.clone()),
            EngineSettings::default(),
        )
    }

    fn auto_hide_panel(manager: &mut PanelManager) -> ToplevelId {
        let mut config = ToplevelConfig::new("top");
        config.auto_hide = true;
        let id = manager.create_toplevel(&config);
        manager.process_timers();
        id
    }

    #[test]
    fn test_initial_reveal_settles_auto_hide_panel_hidden() {
        let clock = ManualClock::new();
        let mut manager = manager(&clock);
        let id = auto_hide_panel(&mut manager);

        let t = manager.toplevel(id).unwrap();
        assert_eq!(t.state(), ToplevelState::AutoHidden);
        assert!(t.initial_animation_done());
        assert_eq!(t.geometry(), Rect::new(0, 0, 1920, 1));
    }

    #[test]
    fn test_pointer_enter_unhides_after_delay() {
        let clock = ManualClock::new();
        let mut manager = manager(&clock);
        let id = auto_hide_panel(&mut manager);

        manager.pointer_enter(id);
        clock.advance_ms(99);
        manager.process_timers();
        assert_eq!(manager.toplevel(id).unwrap().state(), ToplevelState::AutoHidden);

        clock.advance_ms(1);
        manager.process_timers();
        assert_eq!(manager.toplevel(id).unwrap().state(), ToplevelState::Normal);
        assert_eq!(manager.toplevel(id).unwrap().geometry().height, 24);
    }

    #[test]
    fn test_disabler_blocks_auto_hide() {
        let clock = ManualClock::new();
        let mut manager = manager(&clock);
        let id = auto_hide_panel(&mut manager);
        manager.unhide(id);
        manager.flush();

        manager.push_autohide_disabler(id);
        manager.pointer_leave(id);
        clock.advance_ms(1000);
        manager.process_timers();
        assert_eq!(manager.toplevel(id).unwrap().state(), ToplevelState::Normal);

        manager.pop_autohide_disabler(id);
        clock.advance_ms(300);
        manager.process_timers();
        assert_eq!(manager.toplevel(id).unwrap().state(), ToplevelState::AutoHidden);
    }

    #[test]
    fn test_directional_hide_keeps_button_strip() {
        let clock = ManualClock::new();
        let mut manager = manager(&clock);
        let mut config = ToplevelConfig::new("bottom");
        config.orientation = Orientation::Bottom;
        let id = manager.create_toplevel(&config);
        manager.process_timers();

        manager.hide(id, false, Some(ToplevelState::HiddenDown));
        manager.flush();

        let t = manager.toplevel(id).unwrap();
        assert_eq!(t.state(), ToplevelState::HiddenDown);
        assert_eq!(t.geometry(), Rect::new(0, 1070, 1920, 10));
        assert!(manager.struts().find(id).is_none());

        manager.unhide(id);
        manager.flush();
        assert_eq!(manager.toplevel(id).unwrap().geometry(), Rect::new(0, 1056, 1920, 24));
        assert!(manager.struts().find(id).is_some());
    }

    #[test]
    fn test_hide_and_unhide_emit_events() {
        let clock = ManualClock::new();
        let mut manager = manager(&clock);
        let id = manager.create_toplevel(&ToplevelConfig::new("top"));
        manager.process_timers();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        manager.subscribe(move |_, event| sink.borrow_mut().push(event));

        manager.hide(id, false, None);
        manager.hide(id, false, None);
        manager.unhide(id);
        manager.unhide(id);

        assert_eq!(*seen.borrow(), vec![ToplevelEvent::Hiding, ToplevelEvent::Unhiding]);
    }

    #[test]
    fn test_focus_in_unhides_immediately() {
        let clock = ManualClock::new();
        let mut manager = manager(&clock);
        let id = auto_hide_panel(&mut manager);

        manager.focus_in(id);
        assert_eq!(manager.toplevel(id).unwrap().state(), ToplevelState::Normal);
        assert!(manager.toplevel(id).unwrap().has_focus());
    }
}
