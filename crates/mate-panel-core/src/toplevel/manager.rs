use std::time::{Duration, Instant};

use ahash::AHashMap;
use compact_str::CompactString;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::backend::{Placement, PlacementBackend};
use crate::clock::Clock;
use crate::config::{AnimationSpeed, EngineSettings, Lockdown, PanelsConfig, ToplevelConfig, ANIMATION_TICK_MS};
use crate::geometry::{Orientation, Point};
use crate::messages::{EventDispatcher, Property, SubscriptionId, ToplevelEvent};
use crate::monitor::MonitorRegistry;
use crate::struts::StrutRegistry;

use super::size::ContentRequest;
use super::state::{Toplevel, ToplevelState};
use super::ToplevelId;

/// Geometry passes per flush before giving up on a dependency cycle
const MAX_FLUSH_PASSES: usize = 8;

/// Toplevels created and destroyed by [`PanelManager::apply_config`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigApplied {
    pub created: Vec<ToplevelId>,
    pub destroyed: Vec<ToplevelId>,
}

/// Owner of every panel toplevel of the process.
///
/// All mutation happens through `&mut self` on the main thread. Operations
/// only record what changed and mark the affected toplevels dirty;
/// [`PanelManager::flush`] runs the geometry pass and pushes the results to
/// the placement backend.
pub struct PanelManager {
    pub(super) monitors: MonitorRegistry,
    pub(super) struts: StrutRegistry,
    pub(super) toplevels: AHashMap<ToplevelId, Toplevel>,
    pub(super) order: Vec<ToplevelId>,
    pub(super) backend: Box<dyn PlacementBackend>,
    pub(super) clock: Box<dyn Clock>,
    pub(super) dispatcher: EventDispatcher,
    pub(super) pointer: Point,
    pub(super) settings: EngineSettings,
    wm_name: Option<CompactString>,
    pivot_struts: bool,
    next_id: u32,
}

impl PanelManager {
    pub fn new(
        mut monitors: MonitorRegistry,
        mut backend: Box<dyn PlacementBackend>,
        clock: Box<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        monitors.init();

        let wm_name = match backend.window_manager_name() {
            Ok(name) => name,
            Err(e) => {
                warn!("Could not query the window manager name: {}", e);
                None
            }
        };
        let pivot_struts = settings.pivot_enabled_for(wm_name.as_deref());
        if pivot_struts {
            info!("Pivoting inner-edge struts for window manager {:?}", wm_name);
        }

        info!(
            "Panel manager ready: {} monitor(s), {} backend",
            monitors.count(),
            backend.name()
        );

        Self {
            monitors,
            struts: StrutRegistry::new(),
            toplevels: AHashMap::new(),
            order: Vec::new(),
            backend,
            clock,
            dispatcher: EventDispatcher::new(),
            pointer: Point::default(),
            settings,
            wm_name,
            pivot_struts,
            next_id: 1,
        }
    }

    // =========== Accessors ===========

    pub fn toplevel(&self, id: ToplevelId) -> Option<&Toplevel> {
        self.toplevels.get(&id)
    }

    /// Toplevels in creation order
    pub fn toplevels(&self) -> impl Iterator<Item = &Toplevel> {
        self.order.iter().filter_map(|id| self.toplevels.get(id))
    }

    /// Toplevel created from the config entry `config_id`
    pub fn find(&self, config_id: &str) -> Option<ToplevelId> {
        self.toplevels()
            .find(|t| t.config_id == config_id)
            .map(|t| t.id)
    }

    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }

    pub fn struts(&self) -> &StrutRegistry {
        &self.struts
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn window_manager_name(&self) -> Option<&str> {
        self.wm_name.as_deref()
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    // =========== Lifecycle ===========

    /// Create a toplevel from a config entry.
    ///
    /// The toplevel starts retracted and queues its initial reveal; drawers
    /// start shown and skip it. `attach_to` is resolved by
    /// [`PanelManager::apply_config`], not here.
    pub fn create_toplevel(&mut self, config: &ToplevelConfig) -> ToplevelId {
        let id = ToplevelId(self.next_id);
        self.next_id += 1;

        let mut toplevel = Toplevel::from_config(id, config);
        if config.attach_to.is_none() {
            toplevel.state = ToplevelState::AutoHidden;
            toplevel.initial_animation_done = false;
        }

        info!(
            "Created toplevel {} ({}) on the {} edge",
            id,
            config.id,
            config.orientation.as_str()
        );

        self.toplevels.insert(id, toplevel);
        self.order.push(id);
        self.queue_initial_unhide(id);
        id
    }

    /// Tear down a toplevel: cancel its timers, drop its strut, detach its
    /// drawers and clear what the backend published for it.
    pub fn destroy(&mut self, id: ToplevelId) -> bool {
        if !self.toplevels.contains_key(&id) {
            return false;
        }

        if let Some(t) = self.toplevels.get_mut(&id) {
            t.hide_deadline = None;
            t.unhide_deadline = None;
            t.animation_tick = None;
            t.animation = None;
            t.grab = None;
        }

        let change = self.struts.unregister_strut(&self.monitors, id);
        for other in change.others {
            self.mark_dirty(other);
        }

        for child in self.children_of(id) {
            self.detach(child);
        }
        self.detach(id);

        if let Err(e) = self.backend.clear_placement(id) {
            warn!("Could not clear placement of toplevel {}: {}", id, e);
        }

        self.toplevels.remove(&id);
        self.order.retain(|other| *other != id);
        info!("Destroyed toplevel {}", id);
        true
    }

    /// The window of `id` now exists on the display; animations are possible
    /// and the next flush pushes a full placement.
    pub fn realize(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            t.realized = true;
            t.last_placement = None;
            t.dirty = true;
        }
    }

    /// The window behind `id` was replaced; push the full placement again on
    /// the next flush
    pub fn invalidate_placement(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            t.last_placement = None;
            t.dirty = true;
        }
    }

    /// Bring the live toplevels in line with `config`.
    ///
    /// Entries are matched by id. Existing toplevels go through the setters,
    /// so unchanged values produce no notifications.
    pub fn apply_config(&mut self, config: &PanelsConfig) -> ConfigApplied {
        let mut applied = ConfigApplied::default();

        for problem in config.validate() {
            warn!("Panel configuration: {}", problem);
        }

        self.settings = config.engine.clone();
        self.pivot_struts = self.settings.pivot_enabled_for(self.wm_name.as_deref());

        let stale: Vec<ToplevelId> = self
            .toplevels()
            .filter(|t| config.toplevel(&t.config_id).is_none())
            .map(|t| t.id)
            .collect();
        for id in stale {
            self.destroy(id);
            applied.destroyed.push(id);
        }

        for entry in &config.toplevels {
            match self.find(&entry.id) {
                Some(id) => self.apply_entry(id, entry),
                None => applied.created.push(self.create_toplevel(entry)),
            }
        }

        for entry in &config.toplevels {
            let Some(id) = self.find(&entry.id) else {
                continue;
            };

            let parent = entry
                .attach_to
                .as_deref()
                .and_then(|parent| self.find(parent))
                .filter(|parent| *parent != id);

            match parent {
                Some(parent) => {
                    if self.toplevels.get(&id).and_then(|t| t.attached_to()) != Some(parent) {
                        self.attach_to_widget(id, parent, None);
                    }
                }
                None => {
                    if entry.attach_to.is_some() {
                        warn!("Toplevel {} is attached to unknown panel {:?}", entry.id, entry.attach_to);
                    }
                    self.detach(id);
                }
            }
        }

        for id in self.order.clone() {
            self.mark_dirty(id);
        }

        applied
    }

    fn apply_entry(&mut self, id: ToplevelId, entry: &ToplevelConfig) {
        self.set_name(id, entry.name.clone());
        if !self.toplevels.get(&id).is_some_and(|t| t.is_attached()) {
            self.set_orientation(id, entry.orientation);
        }
        self.set_size(id, entry.size);
        self.set_monitor(id, entry.monitor);
        self.set_expand(id, entry.expand);
        self.set_x(id, entry.x, entry.x_right, entry.x_centered);
        self.set_y(id, entry.y, entry.y_bottom, entry.y_centered);
        self.set_auto_hide(id, entry.auto_hide);
        self.set_hide_delay(id, entry.hide_delay);
        self.set_unhide_delay(id, entry.unhide_delay);
        self.set_auto_hide_size(id, entry.auto_hide_size);
        self.set_animate(id, entry.animate);
        self.set_animation_speed(id, entry.animation_speed);
        self.set_enable_buttons(id, entry.enable_buttons);
        self.set_enable_arrows(id, entry.enable_arrows);
        self.set_lockdown(id, entry.lockdown);
    }

    /// Configuration reflecting the live toplevels
    pub fn snapshot_config(&self) -> PanelsConfig {
        let toplevels = self
            .toplevels()
            .map(|t| {
                let attach_to = t
                    .attached_to()
                    .and_then(|parent| self.toplevels.get(&parent))
                    .map(|parent| parent.config_id.clone());
                t.to_config(attach_to)
            })
            .collect();

        PanelsConfig {
            engine: self.settings.clone(),
            toplevels,
        }
    }

    /// Rebuild the monitor inventory after a display change.
    ///
    /// Every strut is dropped and every toplevel re-resolves its configured
    /// monitor on the next flush.
    pub fn reinit_monitors(&mut self) {
        self.monitors.reinit();
        let cleared = self.struts.clear();
        debug!("Dropped {} strut(s) after monitor change", cleared.len());

        for id in self.order.clone() {
            self.mark_dirty(id);
        }
    }

    // =========== Events ===========

    pub fn subscribe(&mut self, callback: impl FnMut(ToplevelId, ToplevelEvent) + 'static) -> SubscriptionId {
        self.dispatcher.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(subscription)
    }

    pub(super) fn emit(&mut self, id: ToplevelId, event: ToplevelEvent) {
        self.dispatcher.emit(id, event);
    }

    pub(super) fn notify(&mut self, id: ToplevelId, property: Property) {
        self.dispatcher.emit(id, ToplevelEvent::PropertyChanged(property));
    }

    // =========== Scheduling ===========

    pub(super) fn now(&self) -> Instant {
        self.clock.now()
    }

    pub(super) fn mark_dirty(&mut self, id: ToplevelId) {
        if let Some(t) = self.toplevels.get_mut(&id) {
            t.dirty = true;
        }
    }

    pub(super) fn children_of(&self, id: ToplevelId) -> SmallVec<[ToplevelId; 4]> {
        self.toplevels()
            .filter(|t| t.attached_to() == Some(id))
            .map(|t| t.id)
            .collect()
    }

    /// Earliest pending hide, unhide or animation deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.toplevels
            .values()
            .flat_map(|t| [t.hide_deadline, t.unhide_deadline, t.animation_tick])
            .flatten()
            .min()
    }

    /// Fire every expired deadline, then flush
    pub fn process_timers(&mut self) {
        let now = self.now();

        for id in self.order.clone() {
            let Some(t) = self.toplevels.get(&id) else {
                continue;
            };
            let hide_due = t.hide_deadline.is_some_and(|d| d <= now);
            let unhide_due = t.unhide_deadline.is_some_and(|d| d <= now);

            if hide_due {
                if let Some(t) = self.toplevels.get_mut(&id) {
                    t.hide_deadline = None;
                }
                self.hide_timeout(id);
            }

            if unhide_due {
                if let Some(t) = self.toplevels.get_mut(&id) {
                    t.unhide_deadline = None;
                }
                self.unhide_timeout(id);
            }

            if let Some(t) = self.toplevels.get_mut(&id) {
                if t.animation_tick.is_some_and(|d| d <= now) {
                    t.animation_tick = t
                        .animation
                        .map(|_| now + Duration::from_millis(ANIMATION_TICK_MS));
                    t.dirty = true;
                }
            }
        }

        self.flush();
    }

    /// Run the geometry pass for every dirty toplevel.
    ///
    /// A pass can dirty other toplevels (strut neighbours, drawers), so
    /// passes repeat until nothing is dirty.
    pub fn flush(&mut self) {
        for _ in 0..MAX_FLUSH_PASSES {
            let dirty: Vec<ToplevelId> = self
                .order
                .iter()
                .copied()
                .filter(|id| self.toplevels.get(id).is_some_and(|t| t.dirty))
                .collect();

            if dirty.is_empty() {
                return;
            }

            for id in dirty {
                self.update_geometry(id);
            }
        }

        warn!("Geometry did not settle after {} passes", MAX_FLUSH_PASSES);
    }

    fn update_geometry(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        t.dirty = false;
        let animating = t.animation.is_some();

        self.update_monitor(id);
        if animating {
            self.step_animation(id);
        } else {
            self.update_size(id);
            self.update_position(id);
        }
        self.update_edges(id);

        if let Some(t) = self.toplevels.get_mut(&id) {
            t.updated_geometry_initial = true;
        }

        self.apply_placement(id);
    }

    fn apply_placement(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get(&id) else {
            return;
        };

        let publish_strut = matches!(t.state, ToplevelState::Normal | ToplevelState::AutoHidden)
            || t.animation.is_some();
        let strut = if publish_strut {
            self.struts.window_hint(&self.monitors, id, self.pivot_struts)
        } else {
            None
        };

        let placement = Placement {
            geometry: t.geometry,
            monitor: t.monitor,
            monitor_geometry: self.monitors.geometry(t.monitor),
            orientation: t.orientation,
            edges: t.edges,
            mapped: t.mapped,
            strut,
        };

        if t.last_placement == Some(placement) {
            return;
        }

        debug!(
            "Placing toplevel {} at {}x{}+{}+{}",
            id,
            placement.geometry.width,
            placement.geometry.height,
            placement.geometry.x,
            placement.geometry.y
        );

        if let Err(e) = self.backend.apply_placement(id, &placement) {
            warn!("Could not place toplevel {}: {}", id, e);
        }

        if let Some(t) = self.toplevels.get_mut(&id) {
            t.last_placement = Some(placement);
        }

        for child in self.children_of(id) {
            self.mark_dirty(child);
        }
    }

    // =========== Setters ===========

    pub fn set_name(&mut self, id: ToplevelId, name: impl Into<CompactString>) -> bool {
        let name = name.into();
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.name == name {
            return false;
        }
        t.name = name;
        self.notify(id, Property::Name);
        true
    }

    /// Dock the toplevel to another edge.
    ///
    /// A floating panel keeps its center: the position is stored as the
    /// center point until the next geometry pass knows the new size. Hidden
    /// directions follow the new axis. Drawers follow their parent.
    pub fn set_orientation(&mut self, id: ToplevelId, orientation: Orientation) -> bool {
        let monitor = match self.toplevels.get(&id) {
            Some(t) if t.orientation != orientation => self.monitors.geometry(t.monitor),
            _ => return false,
        };

        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };

        let mut moved = false;
        if !t.expand && t.updated_geometry_initial && !t.position_centered {
            let rel = t.geometry.translated(-monitor.x, -monitor.y);
            t.x = rel.x + rel.width / 2;
            t.y = rel.y + rel.height / 2;
            t.x_right = None;
            t.y_bottom = None;
            t.position_centered = true;
            moved = true;
        }

        if t.state.is_hidden() && t.orientation.is_horizontal() != orientation.is_horizontal() {
            t.state = t.state.rotated_axis();
        }
        t.orientation = orientation;
        t.dirty = true;

        if moved {
            self.notify(id, Property::X);
            self.notify(id, Property::Y);
        }
        self.notify(id, Property::Orientation);

        for child in self.children_of(id) {
            self.set_orientation(child, orientation.drawer_orientation());
        }
        true
    }

    /// Move to the next edge around the ring
    pub fn rotate(&mut self, id: ToplevelId, clockwise: bool) -> bool {
        let Some(orientation) = self.toplevels.get(&id).map(|t| t.orientation) else {
            return false;
        };
        self.set_orientation(id, orientation.rotated(clockwise))
    }

    pub fn set_size(&mut self, id: ToplevelId, size: i32) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.size == size {
            return false;
        }
        t.size = size;
        t.dirty = true;
        self.notify(id, Property::Size);
        true
    }

    /// Ask for monitor `monitor`. Absent monitors are remembered and picked
    /// up by later passes once they appear.
    pub fn set_monitor(&mut self, id: ToplevelId, monitor: usize) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.configured_monitor == monitor {
            return false;
        }
        t.configured_monitor = monitor;
        t.dirty = true;
        self.notify(id, Property::Monitor);
        true
    }

    /// Stretch the panel along its edge, or let it float.
    ///
    /// Unexpanding centers the panel on its edge.
    pub fn set_expand(&mut self, id: ToplevelId, expand: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.expand == expand {
            return false;
        }
        t.expand = expand;
        t.dirty = true;
        let orientation = t.orientation;
        self.notify(id, Property::Expand);

        if !expand {
            match orientation {
                Orientation::Top => {
                    self.set_x(id, 0, None, true);
                    self.set_y(id, 0, None, false);
                }
                Orientation::Bottom => {
                    self.set_x(id, 0, None, true);
                    self.set_y(id, 0, Some(0), false);
                }
                Orientation::Left => {
                    self.set_y(id, 0, None, true);
                    self.set_x(id, 0, None, false);
                }
                Orientation::Right => {
                    self.set_y(id, 0, None, true);
                    self.set_x(id, 0, Some(0), false);
                }
            }
        }
        true
    }

    /// Set the horizontal position: `x` from the left edge, or `x_right`
    /// from the right edge when given, or centered
    pub fn set_x(&mut self, id: ToplevelId, x: i32, x_right: Option<i32>, centered: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };

        let mut changed: SmallVec<[Property; 3]> = SmallVec::new();
        if t.x != x {
            t.x = x;
            changed.push(Property::X);
        }
        if t.x_right != x_right {
            t.x_right = x_right;
            changed.push(Property::XRight);
        }
        if t.x_centered != centered {
            t.x_centered = centered;
            changed.push(Property::XCentered);
        }
        if changed.is_empty() {
            return false;
        }

        t.position_centered = false;
        t.dirty = true;
        for property in changed {
            self.notify(id, property);
        }
        true
    }

    /// Vertical counterpart of [`PanelManager::set_x`]
    pub fn set_y(&mut self, id: ToplevelId, y: i32, y_bottom: Option<i32>, centered: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };

        let mut changed: SmallVec<[Property; 3]> = SmallVec::new();
        if t.y != y {
            t.y = y;
            changed.push(Property::Y);
        }
        if t.y_bottom != y_bottom {
            t.y_bottom = y_bottom;
            changed.push(Property::YBottom);
        }
        if t.y_centered != centered {
            t.y_centered = centered;
            changed.push(Property::YCentered);
        }
        if changed.is_empty() {
            return false;
        }

        t.position_centered = false;
        t.dirty = true;
        for property in changed {
            self.notify(id, property);
        }
        true
    }

    pub fn set_auto_hide(&mut self, id: ToplevelId, auto_hide: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.auto_hide == auto_hide {
            return false;
        }
        t.auto_hide = auto_hide;
        t.dirty = true;
        self.notify(id, Property::AutoHide);

        if auto_hide {
            self.queue_auto_hide(id);
        } else {
            self.queue_auto_unhide(id);
        }
        true
    }

    pub fn set_hide_delay(&mut self, id: ToplevelId, delay: u32) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.hide_delay == delay {
            return false;
        }
        t.hide_delay = delay;
        self.notify(id, Property::HideDelay);
        true
    }

    pub fn set_unhide_delay(&mut self, id: ToplevelId, delay: u32) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.unhide_delay == delay {
            return false;
        }
        t.unhide_delay = delay;
        self.notify(id, Property::UnhideDelay);
        true
    }

    pub fn set_auto_hide_size(&mut self, id: ToplevelId, size: i32) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.auto_hide_size == size {
            return false;
        }
        t.auto_hide_size = size;
        t.dirty = true;
        self.notify(id, Property::AutoHideSize);
        true
    }

    pub fn set_animate(&mut self, id: ToplevelId, animate: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.animate == animate {
            return false;
        }
        t.animate = animate;
        self.notify(id, Property::Animate);
        true
    }

    pub fn set_animation_speed(&mut self, id: ToplevelId, speed: AnimationSpeed) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.animation_speed == speed {
            return false;
        }
        t.animation_speed = speed;
        self.notify(id, Property::AnimationSpeed);
        true
    }

    pub fn set_enable_buttons(&mut self, id: ToplevelId, enable: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.buttons_enabled == enable {
            return false;
        }
        t.buttons_enabled = enable;
        t.dirty = true;
        self.notify(id, Property::EnableButtons);
        true
    }

    pub fn set_enable_arrows(&mut self, id: ToplevelId, enable: bool) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.arrows_enabled == enable {
            return false;
        }
        t.arrows_enabled = enable;
        self.notify(id, Property::EnableArrows);
        true
    }

    pub fn set_lockdown(&mut self, id: ToplevelId, lockdown: Lockdown) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.lockdown == lockdown {
            return false;
        }
        t.lockdown = lockdown;
        self.notify(id, Property::Lockdown);
        true
    }

    /// Record what the panel contents need. Not a notified property.
    pub fn set_content_request(&mut self, id: ToplevelId, request: ContentRequest) -> bool {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return false;
        };
        if t.content == request {
            return false;
        }
        t.content = request;
        t.dirty = true;
        true
    }
}
