//! Desktop notifications.
//!
//! [`Notifier`] is the delivery seam; [`Notifications`] sits in front of it,
//! drops everything when notifications are disabled, runs delivery off the
//! async workers, and swallows (logs) delivery failures.

use std::sync::Arc;
use std::time::Duration;

use notify_rust::{Notification as Toast, Timeout};

use keepsync_sync::SyncOutcome;

use crate::error::DaemonError;
use crate::paths::APP_NAME;

pub const TITLE_APP: &str = "KeePass Auto-Sync";
pub const TITLE_SYNC: &str = "KeePass Sync";
pub const TITLE_SYNC_ERROR: &str = "KeePass Sync Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
}

impl Notification {
    pub fn normal(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            urgency: Urgency::Normal,
        }
    }

    pub fn critical(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            urgency: Urgency::Critical,
        }
    }

    /// The single notification describing a sync attempt's terminal outcome.
    pub fn for_outcome(outcome: &SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Finished { success: true, .. } => {
                Self::normal(TITLE_SYNC, "Database synchronized successfully")
            }
            SyncOutcome::Finished { exit_code, .. } => Self::critical(
                TITLE_SYNC_ERROR,
                format!("Sync failed (code {exit_code}) - check logs"),
            ),
            SyncOutcome::TimedOut { .. } => Self::critical(TITLE_SYNC_ERROR, "Sync timed out"),
            SyncOutcome::ExecutionError { message } => {
                Self::critical(TITLE_SYNC_ERROR, format!("Error: {message}"))
            }
        }
    }
}

/// Delivers one notification. Implementations may block briefly.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: &Notification, timeout: Duration) -> Result<(), DaemonError>;
}

/// Native desktop notifications through `notify-rust` (D-Bus on Linux and
/// BSD, Notification Center on macOS, toasts on Windows).
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification, timeout: Duration) -> Result<(), DaemonError> {
        desktop_toast(notification, timeout)
            .show()
            .map(|_| ())
            .map_err(|err| DaemonError::Notify(err.to_string()))
    }
}

fn desktop_toast(notification: &Notification, timeout: Duration) -> Toast {
    let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
    let mut toast = Toast::new();
    toast
        .appname(APP_NAME)
        .summary(&notification.title)
        .body(&notification.message)
        .timeout(Timeout::Milliseconds(millis));

    #[cfg(all(unix, not(target_os = "macos")))]
    toast.urgency(match notification.urgency {
        Urgency::Normal => notify_rust::Urgency::Normal,
        Urgency::Critical => notify_rust::Urgency::Critical,
    });

    toast
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Gate and error sink in front of a [`Notifier`].
#[derive(Clone)]
pub struct Notifications {
    notifier: Arc<dyn Notifier>,
    enabled: bool,
    timeout: Duration,
}

impl Notifications {
    pub fn new(notifier: Arc<dyn Notifier>, enabled: bool, timeout: Duration) -> Self {
        Self {
            notifier,
            enabled,
            timeout,
        }
    }

    /// Deliver `notification`; never fails.
    pub async fn send(&self, notification: Notification) {
        if !self.enabled {
            tracing::debug!(title = %notification.title, "notifications disabled; dropped");
            return;
        }

        let notifier = self.notifier.clone();
        let timeout = self.timeout;
        let title = notification.title.clone();
        let delivered =
            tokio::task::spawn_blocking(move || notifier.notify(&notification, timeout)).await;

        match delivered {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(title = %title, error = %err, "notification error"),
            Err(err) => tracing::warn!(title = %title, error = %err, "notification task failed"),
        }
    }
}
