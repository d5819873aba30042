//! Error types for keepsync-sync.

use thiserror::Error;

/// Failures while driving the sync child process.
///
/// The executor folds these into [`SyncOutcome::ExecutionError`](crate::SyncOutcome)
/// rather than returning them.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The command could not be started (missing interpreter, bad cwd, ...).
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the running child failed.
    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
