//! Watch state shared between the monitoring loop and control commands.
//!
//! One [`WatchState`] lives behind one mutex; every reader and writer goes
//! through [`SharedState`]. No lock is ever held across an `.await`.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use keepsync_sync::SyncOutcome;

/// Mutable watcher record. Created stopped; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchState {
    pub running: bool,
    pub last_known_mtime: Option<SystemTime>,
    pub last_sync_time: Option<DateTime<Local>>,
    pub sync_count: u64,
    /// Sync attempts currently in flight (display only).
    pub syncing: u32,
    /// Bumped on every start so a loop left over from an earlier run can
    /// tell that it has been superseded.
    pub generation: u64,
}

impl WatchState {
    /// Count a successful outcome; failures leave the counters alone.
    pub fn record_outcome(&mut self, outcome: &SyncOutcome, now: DateTime<Local>) {
        if outcome.is_success() {
            self.sync_count += 1;
            self.last_sync_time = Some(now);
        }
    }

    pub fn indicator(&self) -> IndicatorColor {
        if self.syncing > 0 {
            IndicatorColor::Syncing
        } else if self.running {
            IndicatorColor::Idle
        } else {
            IndicatorColor::Stopped
        }
    }

    pub fn summary(&self, database: PathBuf, now: DateTime<Local>) -> StatusSummary {
        StatusSummary {
            running: self.running,
            syncing: self.syncing > 0,
            sync_count: self.sync_count,
            last_sync_time: self.last_sync_time,
            last_sync_relative: self
                .last_sync_time
                .map(|at| relative_time(now.signed_duration_since(at))),
            indicator: self.indicator(),
            database,
        }
    }
}

/// Tray indicator state. A shell renders these as gray / green / yellow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorColor {
    Idle,
    Syncing,
    Stopped,
}

impl IndicatorColor {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            IndicatorColor::Idle => [76, 175, 80, 255],
            IndicatorColor::Syncing => [255, 193, 7, 255],
            IndicatorColor::Stopped => [158, 158, 158, 255],
        }
    }
}

/// Read-only view handed to the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub running: bool,
    pub syncing: bool,
    pub sync_count: u64,
    pub last_sync_time: Option<DateTime<Local>>,
    pub last_sync_relative: Option<String>,
    pub indicator: IndicatorColor,
    pub database: PathBuf,
}

impl StatusSummary {
    /// Multi-line status text, as shown in a notification.
    pub fn message(&self) -> String {
        let status = if self.running { "Running" } else { "Stopped" };
        let mut msg = format!("Status: {status}\nSync count: {}", self.sync_count);
        if let Some(at) = self.last_sync_time {
            msg.push_str(&format!("\nLast sync: {}", at.format("%H:%M:%S")));
        }
        msg
    }
}

/// "Just now", "1 minute ago", or "N minutes ago", from whole elapsed minutes.
pub fn relative_time(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_seconds().div_euclid(60);
    match minutes {
        m if m < 1 => "Just now".to_string(),
        1 => "1 minute ago".to_string(),
        m => format!("{m} minutes ago"),
    }
}

/// Relative time plus the absolute timestamp, or "No syncs yet".
pub fn last_sync_message(last: Option<DateTime<Local>>, now: DateTime<Local>) -> String {
    match last {
        Some(at) => format!(
            "{}\n{}",
            relative_time(now.signed_duration_since(at)),
            at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => "No syncs yet".to_string(),
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// The single lock around [`WatchState`].
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<WatchState>,
}

impl SharedState {
    pub fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> WatchState {
        self.lock().clone()
    }

    /// Mark a sync as in flight until the returned guard drops.
    pub fn enter_syncing(&self) -> SyncingGuard<'_> {
        self.lock().syncing += 1;
        SyncingGuard { state: self }
    }
}

/// Restores the "syncing" display state on drop, whatever the outcome.
pub struct SyncingGuard<'a> {
    state: &'a SharedState,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.syncing = state.syncing.saturating_sub(1);
    }
}
