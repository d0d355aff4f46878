use crate::config::PanelsConfig;

/// Events FROM async services TO GTK
#[derive(Debug, Clone)]
pub enum ShellEvent {
    // =========== Configuration Events ===========

    /// panels.json was rewritten on disk and parsed successfully
    ConfigReloaded(PanelsConfig),

    /// panels.json could not be parsed; the running layout is kept
    ConfigInvalid(String),
}

/// Toplevel attribute whose value changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Name,
    Orientation,
    Size,
    Monitor,
    Expand,
    X,
    XRight,
    XCentered,
    Y,
    YBottom,
    YCentered,
    AutoHide,
    HideDelay,
    UnhideDelay,
    AutoHideSize,
    Animate,
    AnimationSpeed,
    EnableButtons,
    EnableArrows,
    Lockdown,
}

/// Notifications emitted by the toplevel engine.
///
/// Each one is delivered together with the id of the toplevel it concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToplevelEvent {
    Hiding,
    Unhiding,
    PopupMenuRequested,
    ExpandToggled,
    HiddenToggled,
    BeginMove,
    BeginResize,
    PropertyChanged(Property),
}
