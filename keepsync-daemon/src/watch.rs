//! The monitoring loop: poll, sync on change, sleep.

use std::sync::Arc;

use tokio::sync::broadcast;

use keepsync_detector::{ChangeDetector, Tick};

use crate::controller::Inner;

/// Poll `detector` every `poll_interval` until stopped or superseded.
///
/// A change is synced before the baseline moves, so the next detection can
/// only happen after the current attempt has returned.
pub(crate) async fn run(
    inner: Arc<Inner>,
    mut detector: ChangeDetector,
    generation: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    tracing::debug!(
        generation,
        database = %detector.path().display(),
        "monitoring loop running",
    );

    loop {
        if !inner.is_current(generation) {
            break;
        }

        match detector.poll() {
            Tick::Unchanged => {}
            Tick::Changed { mtime } => {
                tracing::info!(
                    database = %detector.path().display(),
                    "database change detected, syncing",
                );
                inner.perform_sync().await;
                detector.acknowledge(mtime);

                let mut state = inner.state.lock();
                if state.generation == generation {
                    state.last_known_mtime = Some(mtime);
                }
            }
            Tick::Unavailable {
                error,
                first_report: true,
            } => {
                tracing::warn!(error = %error, "cannot read database timestamp");
            }
            Tick::Unavailable { .. } => {}
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(inner.config.poll_interval) => {}
        }
    }

    tracing::debug!(generation, "monitoring loop exited");
}
