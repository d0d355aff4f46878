use async_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ConfigPaths, PanelsConfig};
use crate::messages::{ShellCommand, ShellEvent};

/// Quiet period after the last file event before panels.json is re-read
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Service that watches panels.json using inotify and owns writes to it
pub struct ConfigWatcher {
    paths: ConfigPaths,
    event_tx: Sender<ShellEvent>,
    command_rx: mpsc::Receiver<ShellCommand>,
}

impl ConfigWatcher {
    pub fn new(paths: ConfigPaths, event_tx: Sender<ShellEvent>, command_rx: mpsc::Receiver<ShellCommand>) -> Self {
        Self {
            paths,
            event_tx,
            command_rx,
        }
    }

    /// Run the config watcher (blocks forever)
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Starting config watcher for {:?}", self.paths.panels_config);

        let dir = self.paths.config_dir();
        let _ = tokio::fs::create_dir_all(&dir).await;

        // Channel for file events
        let (notify_tx, mut notify_rx) = mpsc::channel::<PathBuf>(32);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        for path in event.paths {
                            let _ = notify_tx.blocking_send(path);
                        }
                    }
                }
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        // Watch the directory since the file might not exist yet
        if dir.exists() {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            debug!("Watching directory: {:?}", dir);
        }

        let mut debounce_deadline: Option<tokio::time::Instant> = None;

        loop {
            tokio::select! {
                Some(path) = notify_rx.recv() => {
                    if path == self.paths.panels_config {
                        debounce_deadline = Some(tokio::time::Instant::now() + DEBOUNCE);
                    }
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(ShellCommand::ReloadConfig) => self.reload().await,
                        Some(ShellCommand::SaveConfig(config)) => self.save(config).await,
                        None => {
                            debug!("Config command channel closed");
                            return Ok(());
                        }
                    }
                }

                _ = async {
                    if let Some(deadline) = debounce_deadline {
                        tokio::time::sleep_until(deadline).await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    debounce_deadline = None;
                    self.reload().await;
                }
            }
        }
    }

    /// Re-read panels.json and broadcast the result
    async fn reload(&self) {
        debug!("Reloading panel config: {:?}", self.paths.panels_config);

        let data = match tokio::fs::read(&self.paths.panels_config).await {
            Ok(data) => data,
            Err(e) => {
                // File might not exist yet, that's OK
                debug!("Could not read panel config: {}", e);
                return;
            }
        };

        let event = match parse(&data) {
            Ok(config) => {
                info!("Panel config reloaded with {} toplevel(s)", config.toplevels.len());
                ShellEvent::ConfigReloaded(config)
            }
            Err(e) => {
                warn!("Failed to parse panel config: {}", e);
                ShellEvent::ConfigInvalid(e.to_string())
            }
        };
        let _ = self.event_tx.send(event).await;
    }

    async fn save(&self, config: PanelsConfig) {
        let data = match serde_json::to_vec_pretty(&config) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize panel config: {}", e);
                return;
            }
        };

        match tokio::fs::write(&self.paths.panels_config, data).await {
            Ok(()) => debug!("Saved panel config to {:?}", self.paths.panels_config),
            Err(e) => warn!("Failed to save panel config: {}", e),
        }
    }
}

fn parse(data: &[u8]) -> serde_json::Result<PanelsConfig> {
    serde_json::from_slice(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reports_syntax_errors() {
        assert!(parse(b"{ \"toplevels\": [").is_err());
        let config = parse(b"{}").unwrap();
        assert_eq!(config, PanelsConfig::default());
    }

    #[tokio::test]
    async fn test_reload_and_save_through_commands() {
        let dir = std::env::temp_dir().join(format!("mate-panel-watcher-{}", std::process::id()));
        let paths = ConfigPaths::with_panels_config(dir.join("panels.json"));
        let (event_tx, event_rx) = async_channel::bounded(8);
        let (command_tx, command_rx) = mpsc::channel(8);

        let watcher = ConfigWatcher::new(paths.clone(), event_tx, command_rx);
        let task = tokio::spawn(watcher.run());

        let mut config = PanelsConfig::default();
        config.toplevels.truncate(1);
        command_tx.send(ShellCommand::SaveConfig(config.clone())).await.unwrap();
        command_tx.send(ShellCommand::ReloadConfig).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(ShellEvent::ConfigReloaded(reloaded)) = event_rx.recv().await {
                    break reloaded;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(event, config);

        task.abort();
        let _ = std::fs::remove_dir_all(dir);
    }
}
