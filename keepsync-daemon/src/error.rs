use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watcher runtime, control protocol, and notifier.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("control protocol error: {0}")]
    Protocol(String),

    #[error("keepsync is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },

    #[error("keepsync is already running (socket in use: {socket})")]
    AlreadyRunning { socket: PathBuf },

    #[error("the control channel needs Unix sockets, which this platform lacks")]
    ControlUnavailable,

    #[error("monitoring is stopped; start it before syncing")]
    WatcherStopped,

    #[error("notification failed: {0}")]
    Notify(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
