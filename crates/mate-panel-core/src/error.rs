use std::path::PathBuf;

/// Errors surfaced by configuration loading and platform primitives.
///
/// Engine operations never return these; they are logged and the panel keeps
/// running with degraded behaviour.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("failed to read {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("monitor enumeration via {source_name} failed: {reason}")]
    MonitorEnumeration {
        source_name: &'static str,
        reason: String,
    },

    #[error("{backend} backend: {reason}")]
    Backend {
        backend: &'static str,
        reason: String,
    },

    #[error("{backend} backend does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("unknown toplevel {0}")]
    UnknownToplevel(String),
}

impl PanelError {
    pub fn backend(backend: &'static str, reason: impl ToString) -> Self {
        Self::Backend {
            backend,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
