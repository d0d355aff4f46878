mod commands;
mod dispatch;
mod events;

pub use commands::ShellCommand;
pub use dispatch::{EventDispatcher, SubscriptionId};
pub use events::{Property, ShellEvent, ToplevelEvent};
