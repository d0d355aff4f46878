use std::time::Instant;

use compact_str::CompactString;

use crate::backend::Placement;
use crate::config::{AnimationSpeed, Lockdown, ToplevelConfig, DEFAULT_HIDE_BUTTON_SIZE};
use crate::geometry::{Orientation, PanelEdges, Point, Rect};

use super::grab::Grab;
use super::size::ContentRequest;
use super::ToplevelId;

/// Visibility state of a toplevel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToplevelState {
    #[default]
    Normal,
    AutoHidden,
    HiddenUp,
    HiddenDown,
    HiddenLeft,
    HiddenRight,
}

impl ToplevelState {
    pub fn is_hidden(self) -> bool {
        !matches!(self, ToplevelState::Normal | ToplevelState::AutoHidden)
    }

    /// Whether a hidden direction can be used with `orientation`
    pub fn fits(self, orientation: Orientation) -> bool {
        match self {
            ToplevelState::HiddenUp | ToplevelState::HiddenDown => orientation.is_horizontal(),
            ToplevelState::HiddenLeft | ToplevelState::HiddenRight => orientation.is_vertical(),
            _ => true,
        }
    }

    /// Hidden state a toplevel docked at `orientation` uses by default
    pub fn default_hidden(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Top => ToplevelState::HiddenUp,
            Orientation::Bottom => ToplevelState::HiddenDown,
            Orientation::Left => ToplevelState::HiddenLeft,
            Orientation::Right => ToplevelState::HiddenRight,
        }
    }

    /// Same hidden direction seen from the other axis
    pub fn rotated_axis(self) -> Self {
        match self {
            ToplevelState::HiddenUp => ToplevelState::HiddenLeft,
            ToplevelState::HiddenLeft => ToplevelState::HiddenUp,
            ToplevelState::HiddenDown => ToplevelState::HiddenRight,
            ToplevelState::HiddenRight => ToplevelState::HiddenDown,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Animation {
    pub start: Instant,
    pub end: Instant,
    /// Monitor-relative target rectangle
    pub target: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attachment {
    pub parent: ToplevelId,
    /// Desktop rectangle of the widget the drawer hangs off; `None` while
    /// the widget has no allocation
    pub widget: Option<Rect>,
    pub widget_mapped: bool,
}

/// One panel window
#[derive(Debug)]
pub struct Toplevel {
    pub(crate) id: ToplevelId,
    pub(crate) config_id: CompactString,
    pub(crate) name: CompactString,

    pub(crate) orientation: Orientation,
    pub(crate) size: i32,
    pub(crate) configured_monitor: usize,
    pub(crate) monitor: usize,
    pub(crate) expand: bool,
    pub(crate) x: i32,
    pub(crate) x_right: Option<i32>,
    pub(crate) x_centered: bool,
    pub(crate) y: i32,
    pub(crate) y_bottom: Option<i32>,
    pub(crate) y_centered: bool,

    pub(crate) auto_hide: bool,
    pub(crate) hide_delay: u32,
    pub(crate) unhide_delay: u32,
    pub(crate) auto_hide_size: i32,
    pub(crate) animate: bool,
    pub(crate) animation_speed: AnimationSpeed,
    pub(crate) buttons_enabled: bool,
    pub(crate) arrows_enabled: bool,
    pub(crate) lockdown: Lockdown,
    pub(crate) hide_button_size: i32,

    pub(crate) content: ContentRequest,
    pub(crate) applet_allocations: Vec<i32>,

    pub(crate) geometry: Rect,
    pub(crate) original_width: i32,
    pub(crate) original_height: i32,
    pub(crate) edges: PanelEdges,
    pub(crate) floating: bool,
    pub(crate) updated_geometry_initial: bool,
    pub(crate) position_centered: bool,

    pub(crate) state: ToplevelState,
    pub(crate) initial_animation_done: bool,
    pub(crate) animation: Option<Animation>,

    pub(crate) hide_deadline: Option<Instant>,
    pub(crate) unhide_deadline: Option<Instant>,
    pub(crate) animation_tick: Option<Instant>,

    pub(crate) autohide_disablers: u32,
    pub(crate) pointer_inside: bool,
    pub(crate) has_focus: bool,

    pub(crate) grab: Option<Grab>,
    pub(crate) drag_offset: Point,

    pub(crate) attachment: Option<Attachment>,
    pub(crate) hidden_by_parent: bool,

    pub(crate) realized: bool,
    pub(crate) mapped: bool,
    pub(crate) dirty: bool,
    pub(crate) last_placement: Option<Placement>,
}

impl Toplevel {
    pub(crate) fn from_config(id: ToplevelId, config: &ToplevelConfig) -> Self {
        Self {
            id,
            config_id: config.id.clone(),
            name: config.name.clone(),
            orientation: config.orientation,
            size: config.size,
            configured_monitor: config.monitor,
            monitor: 0,
            expand: config.expand,
            x: config.x,
            x_right: config.x_right,
            x_centered: config.x_centered,
            y: config.y,
            y_bottom: config.y_bottom,
            y_centered: config.y_centered,
            auto_hide: config.auto_hide,
            hide_delay: config.hide_delay,
            unhide_delay: config.unhide_delay,
            auto_hide_size: config.auto_hide_size,
            animate: config.animate,
            animation_speed: config.animation_speed,
            buttons_enabled: config.enable_buttons,
            arrows_enabled: config.enable_arrows,
            lockdown: config.lockdown,
            hide_button_size: DEFAULT_HIDE_BUTTON_SIZE,
            content: ContentRequest::default(),
            applet_allocations: Vec::new(),
            geometry: Rect::default(),
            original_width: 0,
            original_height: 0,
            edges: PanelEdges::empty(),
            floating: false,
            updated_geometry_initial: false,
            position_centered: false,
            state: ToplevelState::Normal,
            initial_animation_done: true,
            animation: None,
            hide_deadline: None,
            unhide_deadline: None,
            animation_tick: None,
            autohide_disablers: 0,
            pointer_inside: false,
            has_focus: false,
            grab: None,
            drag_offset: Point::default(),
            attachment: None,
            hidden_by_parent: false,
            realized: false,
            mapped: true,
            dirty: true,
            last_placement: None,
        }
    }

    pub fn id(&self) -> ToplevelId {
        self.id
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    /// Monitor index the panel is actually placed on
    pub fn monitor(&self) -> usize {
        self.monitor
    }

    /// Monitor index asked for by configuration, which may not exist
    pub fn configured_monitor(&self) -> usize {
        self.configured_monitor
    }

    pub fn expand(&self) -> bool {
        self.expand
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn x_right(&self) -> Option<i32> {
        self.x_right
    }

    pub fn x_centered(&self) -> bool {
        self.x_centered
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn y_bottom(&self) -> Option<i32> {
        self.y_bottom
    }

    pub fn y_centered(&self) -> bool {
        self.y_centered
    }

    pub fn auto_hide(&self) -> bool {
        self.auto_hide
    }

    pub fn hide_delay(&self) -> u32 {
        self.hide_delay
    }

    pub fn unhide_delay(&self) -> u32 {
        self.unhide_delay
    }

    pub fn auto_hide_size(&self) -> i32 {
        self.auto_hide_size
    }

    pub fn animate(&self) -> bool {
        self.animate
    }

    pub fn animation_speed(&self) -> AnimationSpeed {
        self.animation_speed
    }

    pub fn buttons_enabled(&self) -> bool {
        self.buttons_enabled
    }

    pub fn arrows_enabled(&self) -> bool {
        self.arrows_enabled
    }

    pub fn lockdown(&self) -> Lockdown {
        self.lockdown
    }

    /// Desktop-absolute window rectangle
    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    /// Size the panel has when fully shown
    pub fn original_size(&self) -> (i32, i32) {
        (self.original_width, self.original_height)
    }

    pub fn edges(&self) -> PanelEdges {
        self.edges
    }

    /// Not touching the edge it is docked to
    pub fn is_floating(&self) -> bool {
        self.floating
    }

    pub fn state(&self) -> ToplevelState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn initial_animation_done(&self) -> bool {
        self.initial_animation_done
    }

    /// Monitor-relative target of the running animation
    pub fn animation_target(&self) -> Option<Rect> {
        self.animation.map(|a| a.target)
    }

    pub fn autohide_disablers(&self) -> u32 {
        self.autohide_disablers
    }

    pub fn autohide_disabled(&self) -> bool {
        self.autohide_disablers > 0
    }

    pub fn contains_pointer(&self) -> bool {
        self.pointer_inside
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn grab_op(&self) -> Option<super::GrabOp> {
        self.grab.as_ref().map(|g| g.op)
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn attached_to(&self) -> Option<ToplevelId> {
        self.attachment.as_ref().map(|a| a.parent)
    }

    /// Desktop rectangle of the widget a drawer hangs off, once reported
    pub fn attach_widget(&self) -> Option<Rect> {
        self.attachment.as_ref().and_then(|a| a.widget)
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }

    /// Sizes handed to applets with discrete size hints, in hint order
    pub fn applet_allocations(&self) -> &[i32] {
        &self.applet_allocations
    }

    /// Whether the hide buttons are shown
    pub fn hide_buttons_visible(&self) -> bool {
        self.buttons_enabled || self.state.is_hidden()
    }

    /// Auto-hide sliver actually used, at most half the panel thickness
    pub fn effective_auto_hide_size(&self) -> i32 {
        let thickness = if self.orientation.is_horizontal() {
            self.original_height
        } else {
            self.original_width
        };
        self.auto_hide_size.clamp(1, (thickness / 2).max(1))
    }

    pub(crate) fn thickness(&self) -> i32 {
        if self.orientation.is_horizontal() {
            self.original_height
        } else {
            self.original_width
        }
    }

    /// Config entry reflecting the current live values
    pub fn to_config(&self, attach_to: Option<CompactString>) -> ToplevelConfig {
        ToplevelConfig {
            id: self.config_id.clone(),
            name: self.name.clone(),
            orientation: self.orientation,
            size: self.size,
            monitor: self.configured_monitor,
            expand: self.expand,
            x: self.x,
            x_right: self.x_right,
            x_centered: self.x_centered,
            y: self.y,
            y_bottom: self.y_bottom,
            y_centered: self.y_centered,
            auto_hide: self.auto_hide,
            hide_delay: self.hide_delay,
            unhide_delay: self.unhide_delay,
            auto_hide_size: self.auto_hide_size,
            animate: self.animate,
            animation_speed: self.animation_speed,
            enable_buttons: self.buttons_enabled,
            enable_arrows: self.arrows_enabled,
            lockdown: self.lockdown,
            attach_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_direction_compatibility() {
        assert!(ToplevelState::HiddenUp.fits(Orientation::Top));
        assert!(ToplevelState::HiddenDown.fits(Orientation::Bottom));
        assert!(!ToplevelState::HiddenLeft.fits(Orientation::Top));
        assert!(ToplevelState::HiddenRight.fits(Orientation::Left));
        assert!(ToplevelState::AutoHidden.fits(Orientation::Right));
    }

    #[test]
    fn test_rotated_axis_is_an_involution() {
        for state in [
            ToplevelState::HiddenUp,
            ToplevelState::HiddenDown,
            ToplevelState::HiddenLeft,
            ToplevelState::HiddenRight,
        ] {
            assert_ne!(state.rotated_axis(), state);
            assert_eq!(state.rotated_axis().rotated_axis(), state);
        }
    }

    #[test]
    fn test_effective_auto_hide_size_is_clamped() {
        let mut config = ToplevelConfig::new("p");
        config.auto_hide_size = 40;
        let mut toplevel = Toplevel::from_config(ToplevelId(1), &config);
        toplevel.original_height = 24;
        assert_eq!(toplevel.effective_auto_hide_size(), 12);

        toplevel.auto_hide_size = 0;
        assert_eq!(toplevel.effective_auto_hide_size(), 1);

        toplevel.auto_hide_size = -5;
        toplevel.original_height = 1;
        assert_eq!(toplevel.effective_auto_hide_size(), 1);
    }
}
