//! Settings model for `config.json`.
//!
//! Every section carries `#[serde(default)]`, so a missing key falls back to
//! its own default instead of dropping the whole section. Unknown keys are
//! ignored. Durations are expressed in (possibly fractional) seconds.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_DATABASE_FILE: &str = "Passwords.kdbx";
pub const DEFAULT_MONITOR_INTERVAL_SECS: f64 = 2.0;
pub const DEFAULT_NOTIFICATION_TIMEOUT_SECS: f64 = 3.0;
pub const DEFAULT_SYNC_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_COMMIT_MESSAGE_FORMAT: &str = "Update from {hostname} at {timestamp}";

// ---------------------------------------------------------------------------
// Seconds
// ---------------------------------------------------------------------------

/// A duration in seconds as written in the config file.
///
/// Whole values serialize as integers (`2`, not `2.0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seconds(pub f64);

impl Seconds {
    /// Convert to a [`Duration`], substituting `fallback` for zero, negative,
    /// or non-finite values.
    pub fn to_duration_or(self, fallback: Duration) -> Duration {
        if self.0 <= 0.0 {
            return fallback;
        }
        Duration::try_from_secs_f64(self.0).unwrap_or(fallback)
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl Serialize for Seconds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 >= 0.0 && self.0 <= u32::MAX as f64 {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Seconds)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `database` section: which file to watch and how often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// File name (or path) of the database, relative to the base directory.
    pub filename: String,
    pub monitor_interval: Seconds,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            filename: DEFAULT_DATABASE_FILE.to_string(),
            monitor_interval: Seconds(DEFAULT_MONITOR_INTERVAL_SECS),
        }
    }
}

/// `git` section. Not interpreted by keepsync itself; the sync script reads
/// it from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    pub auto_pull: bool,
    pub auto_push: bool,
    pub commit_message_format: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            auto_pull: true,
            auto_push: true,
            commit_message_format: DEFAULT_COMMIT_MESSAGE_FORMAT.to_string(),
        }
    }
}

/// `notifications` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub timeout: Seconds,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Seconds(DEFAULT_NOTIFICATION_TIMEOUT_SECS),
        }
    }
}

/// `sync` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub timeout: Seconds,
    /// Custom sync script, relative to the base directory. When absent the
    /// platform default (`sync-keepass.sh` / `sync-keepass.bat`) is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            timeout: Seconds(DEFAULT_SYNC_TIMEOUT_SECS),
            script: None,
        }
    }
}

/// Root of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub git: GitSettings,
    pub notifications: NotificationSettings,
    pub sync: SyncSettings,
}

impl Settings {
    /// Resolve the runtime snapshot used by the watcher.
    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            poll_interval: self
                .database
                .monitor_interval
                .to_duration_or(defaults.poll_interval),
            sync_timeout: self.sync.timeout.to_duration_or(defaults.sync_timeout),
            notifications_enabled: self.notifications.enabled,
            notification_timeout: self
                .notifications
                .timeout
                .to_duration_or(defaults.notification_timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Immutable timing/notification snapshot, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub sync_timeout: Duration,
    pub notifications_enabled: bool,
    pub notification_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs_f64(DEFAULT_MONITOR_INTERVAL_SECS),
            sync_timeout: Duration::from_secs_f64(DEFAULT_SYNC_TIMEOUT_SECS),
            notifications_enabled: true,
            notification_timeout: Duration::from_secs_f64(DEFAULT_NOTIFICATION_TIMEOUT_SECS),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
