//! The [`Controller`] owns the watcher: its state, its executor, its loop task.
//!
//! Control commands and the monitoring loop share one [`Inner`]; nothing else
//! holds watcher state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use keepsync_core::SyncConfig;
use keepsync_detector::ChangeDetector;
use keepsync_sync::{SyncCommand, SyncExecutor, SyncOutcome};

use crate::error::DaemonError;
use crate::notifier::{Notification, Notifications, Notifier, TITLE_APP};
use crate::paths::STOP_JOIN_TIMEOUT;
use crate::state::{self, SharedState, StatusSummary, WatchState};
use crate::watch;

/// What gets watched and what runs when it changes.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub database: PathBuf,
    pub working_dir: PathBuf,
    pub command: SyncCommand,
}

struct LoopHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

pub(crate) struct Inner {
    pub(crate) config: SyncConfig,
    pub(crate) target: WatchTarget,
    pub(crate) state: SharedState,
    executor: SyncExecutor,
    notifications: Notifications,
    loop_handle: Mutex<Option<LoopHandle>>,
}

impl Inner {
    /// True while `generation` is the live run of a started watcher.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.running && state.generation == generation
    }

    /// Run one sync attempt, record it, and report it.
    pub(crate) async fn perform_sync(&self) -> SyncOutcome {
        let outcome = {
            let _syncing = self.state.enter_syncing();
            self.executor
                .execute(
                    &self.target.command,
                    &self.target.working_dir,
                    self.config.sync_timeout,
                )
                .await
        };

        self.state.lock().record_outcome(&outcome, Local::now());
        self.notifications
            .send(Notification::for_outcome(&outcome))
            .await;
        outcome
    }
}

/// Cloneable handle to the watcher.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn new(config: SyncConfig, target: WatchTarget, notifier: Arc<dyn Notifier>) -> Self {
        let notifications = Notifications::new(
            notifier,
            config.notifications_enabled,
            config.notification_timeout,
        );
        Self {
            inner: Arc::new(Inner {
                config,
                target,
                state: SharedState::default(),
                executor: SyncExecutor::new(),
                notifications,
                loop_handle: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn target(&self) -> &WatchTarget {
        &self.inner.target
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Begin monitoring from a freshly read baseline.
    ///
    /// Returns `false` without side effects when already running.
    pub async fn start(&self) -> bool {
        {
            let mut slot = self.lock_handle();
            let generation = {
                let mut state = self.inner.state.lock();
                if state.running {
                    return false;
                }
                state.running = true;
                state.generation += 1;
                state.generation
            };

            let detector = ChangeDetector::new(self.inner.target.database.clone());
            self.inner.state.lock().last_known_mtime = detector.baseline();
            if detector.baseline().is_none() {
                tracing::warn!(
                    database = %self.inner.target.database.display(),
                    "database not found; waiting for it to appear",
                );
            }

            let (shutdown, shutdown_rx) = broadcast::channel(1);
            let task = tokio::spawn(watch::run(
                self.inner.clone(),
                detector,
                generation,
                shutdown_rx,
            ));
            *slot = Some(LoopHandle { shutdown, task });
        }

        tracing::info!(
            database = %self.inner.target.database.display(),
            interval_ms = self.inner.config.poll_interval.as_millis() as u64,
            "monitoring started",
        );
        self.inner
            .notifications
            .send(Notification::normal(TITLE_APP, "Monitoring started"))
            .await;
        true
    }

    /// Stop monitoring and wait (bounded) for the loop to exit.
    ///
    /// An in-flight sync is left to finish; its loop exits at its next tick.
    /// Returns `false` without side effects when not running.
    pub async fn stop(&self) -> bool {
        let handle = {
            let mut slot = self.lock_handle();
            {
                let mut state = self.inner.state.lock();
                if !state.running {
                    return false;
                }
                state.running = false;
            }
            slot.take()
        };

        if let Some(LoopHandle { shutdown, task }) = handle {
            let _ = shutdown.send(());
            match tokio::time::timeout(STOP_JOIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::error!(error = %err, "monitoring loop panicked"),
                Err(_) => tracing::warn!(
                    timeout_ms = STOP_JOIN_TIMEOUT.as_millis() as u64,
                    "monitoring loop still busy after stop; leaving it to finish",
                ),
            }
        }

        tracing::info!("monitoring stopped");
        self.inner
            .notifications
            .send(Notification::normal(TITLE_APP, "Monitoring stopped"))
            .await;
        true
    }

    /// Run a sync immediately, outside the polling cadence.
    pub async fn sync_now(&self) -> Result<SyncOutcome, DaemonError> {
        if !self.is_running() {
            return Err(DaemonError::WatcherStopped);
        }
        tracing::info!("manual sync requested");
        Ok(self.inner.perform_sync().await)
    }

    pub fn status(&self) -> StatusSummary {
        self.inner
            .state
            .lock()
            .summary(self.inner.target.database.clone(), Local::now())
    }

    /// Copy of the full watcher record.
    pub fn snapshot(&self) -> WatchState {
        self.inner.state.snapshot()
    }

    pub fn last_sync_message(&self) -> String {
        let last = self.inner.state.lock().last_sync_time;
        state::last_sync_message(last, Local::now())
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<LoopHandle>> {
        self.inner
            .loop_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _: &Notification, _: Duration) -> Result<(), DaemonError> {
            Ok(())
        }
    }

    fn controller(dir: &std::path::Path) -> Controller {
        let config = SyncConfig {
            poll_interval: Duration::from_millis(20),
            sync_timeout: Duration::from_secs(2),
            notifications_enabled: true,
            notification_timeout: Duration::from_secs(1),
        };
        let target = WatchTarget {
            database: dir.join("Passwords.kdbx"),
            working_dir: dir.to_path_buf(),
            command: SyncCommand::new("true", Vec::<String>::new()),
        };
        Controller::new(config, target, Arc::new(Silent))
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let controller = controller(dir.path());

        assert!(!controller.stop().await, "stop while stopped is a no-op");
        assert!(controller.start().await);
        assert!(!controller.start().await, "second start is a no-op");
        assert_eq!(controller.snapshot().generation, 1);

        assert!(controller.stop().await);
        assert!(!controller.is_running());
        assert!(!controller.stop().await);
    }

    #[tokio::test]
    async fn sync_now_requires_running_watcher() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let controller = controller(dir.path());
        let err = controller.sync_now().await.expect_err("stopped watcher");
        assert!(matches!(err, DaemonError::WatcherStopped));
        assert_eq!(controller.status().sync_count, 0);
    }

    #[tokio::test]
    async fn restart_bumps_generation() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let controller = controller(dir.path());
        controller.start().await;
        controller.stop().await;
        controller.start().await;
        let state = controller.snapshot();
        assert!(state.running);
        assert_eq!(state.generation, 2);
        assert!(controller.inner.is_current(2));
        assert!(!controller.inner.is_current(1));
        controller.stop().await;
    }
}
