pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod messages;
pub mod monitor;
pub mod services;
pub mod struts;
pub mod toplevel;

pub use backend::{BackendCall, Placement, PlacementBackend, RecordingBackend};
#[cfg(feature = "x11")]
pub use backend::X11StrutBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnimationSpeed, ConfigPaths, EngineSettings, Lockdown, PanelsConfig, ToplevelConfig};
pub use error::{PanelError, Result};
pub use geometry::{Orientation, PanelEdges, Point, Rect};
pub use messages::{EventDispatcher, Property, ShellCommand, ShellEvent, SubscriptionId, ToplevelEvent};
#[cfg(feature = "x11")]
pub use monitor::RandrMonitorSource;
pub use monitor::{Monitor, MonitorRegistry, MonitorSource, SharedMonitorSource, StaticMonitorSource};
pub use services::{ConfigWatcher, ServiceHub};
pub use struts::{PanelStrut, StrutRegistry, WmStrut};
pub use toplevel::{
    window_title, ConfigApplied, ContentRequest, GrabKey, GrabOp, InputModifiers, PanelManager, Toplevel,
    ToplevelId, ToplevelState,
};
