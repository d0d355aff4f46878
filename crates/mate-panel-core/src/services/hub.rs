use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::ConfigPaths;
use crate::messages::{ShellCommand, ShellEvent};
use super::ConfigWatcher;

/// Central hub for the async services running beside the GTK main loop
pub struct ServiceHub {
    /// Event receiver for GTK components
    event_rx: async_channel::Receiver<ShellEvent>,
    /// Command sender for GTK to use
    command_tx: mpsc::Sender<ShellCommand>,
    /// Tokio runtime
    runtime: Runtime,
}

impl ServiceHub {
    /// Create a new ServiceHub with its own tokio runtime
    pub fn new(paths: ConfigPaths) -> anyhow::Result<Self> {
        let runtime = Runtime::new()?;

        // Create communication channels
        let (event_tx, event_rx) = async_channel::bounded::<ShellEvent>(64);
        let (command_tx, command_rx) = mpsc::channel::<ShellCommand>(64);
        let (config_tx, config_rx) = mpsc::channel::<ShellCommand>(64);

        runtime.spawn(Self::route_commands(command_rx, config_tx));

        runtime.spawn(async move {
            let watcher = ConfigWatcher::new(paths, event_tx, config_rx);
            if let Err(e) = watcher.run().await {
                error!("Config watcher error: {}", e);
            }
        });

        info!("ServiceHub initialized with all services");

        Ok(Self {
            event_rx,
            command_tx,
            runtime,
        })
    }

    /// Route commands to appropriate services
    async fn route_commands(mut rx: mpsc::Receiver<ShellCommand>, config_tx: mpsc::Sender<ShellCommand>) {
        while let Some(cmd) = rx.recv().await {
            match &cmd {
                ShellCommand::ReloadConfig | ShellCommand::SaveConfig(_) => {
                    if config_tx.send(cmd).await.is_err() {
                        warn!("Config watcher stopped, dropping command");
                    }
                }
            }
        }
    }

    /// Get a clone of the event receiver for a component
    pub fn event_receiver(&self) -> async_channel::Receiver<ShellEvent> {
        self.event_rx.clone()
    }

    /// Enter the runtime context (for GTK callbacks)
    pub fn enter_runtime(&self) -> tokio::runtime::EnterGuard<'_> {
        self.runtime.enter()
    }

    /// Queue a command from GTK callbacks, where blocking is not allowed
    pub fn send_command(&self, command: ShellCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            error!("Dropping shell command: {}", e);
        }
    }
}
