//! Modification-time change detection for `keepsync-detector`.
//!
//! [`ChangeDetector`] remembers a baseline timestamp for one file and, on each
//! [`poll`](ChangeDetector::poll), compares the current modification time
//! against it. The baseline only moves when the caller
//! [`acknowledge`](ChangeDetector::acknowledge)s a change, which lets the
//! caller finish its sync attempt before the next comparison happens.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Errors from reading the watched file's metadata.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DetectError {
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            DetectError::Io { source, .. } => source.kind(),
        }
    }
}

/// Result of one poll tick.
#[derive(Debug)]
pub enum Tick {
    /// Timestamp equals the baseline.
    Unchanged,
    /// Timestamp differs from the baseline. The baseline is left untouched
    /// until [`ChangeDetector::acknowledge`] is called.
    Changed { mtime: SystemTime },
    /// File missing or unreadable; treated as "no change".
    ///
    /// `first_report` is true only for the first tick of an unavailable
    /// stretch, so callers can log the condition once.
    Unavailable {
        error: DetectError,
        first_report: bool,
    },
}

/// Polling change detector for a single file.
#[derive(Debug)]
pub struct ChangeDetector {
    path: PathBuf,
    baseline: Option<SystemTime>,
    unavailable: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read the modification time of `path`.
pub fn read_mtime(path: &Path) -> Result<SystemTime, DetectError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| DetectError::Io {
            path: path.to_path_buf(),
            source,
        })
}

impl ChangeDetector {
    /// Create a detector whose baseline is the file's current timestamp.
    ///
    /// A missing file yields no baseline, so its later appearance counts as a
    /// change.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let baseline = read_mtime(&path).ok();
        Self {
            path,
            baseline,
            unavailable: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn baseline(&self) -> Option<SystemTime> {
        self.baseline
    }

    /// Read the timestamp once and classify it against the baseline.
    pub fn poll(&mut self) -> Tick {
        match read_mtime(&self.path) {
            Ok(mtime) => {
                self.unavailable = false;
                if self.baseline == Some(mtime) {
                    Tick::Unchanged
                } else {
                    Tick::Changed { mtime }
                }
            }
            Err(error) => {
                let first_report = !self.unavailable;
                self.unavailable = true;
                Tick::Unavailable {
                    error,
                    first_report,
                }
            }
        }
    }

    /// Move the baseline to `mtime`, after the sync for it has completed.
    pub fn acknowledge(&mut self, mtime: SystemTime) {
        self.baseline = Some(mtime);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
