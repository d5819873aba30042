//! Watcher behaviour against real sync scripts run through `sh`.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

use keepsync_core::SyncConfig;
use keepsync_daemon::{Controller, DaemonError, Notification, Notifier, Urgency, WatchTarget};
use keepsync_sync::SyncCommand;

const INTERVAL: Duration = Duration::from_millis(50);
const BASE_MTIME: i64 = 1_600_000_000;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Notification>>,
}

impl Recorder {
    fn messages(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    fn critical(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.urgency == Urgency::Critical)
            .cloned()
            .collect()
    }
}

impl Notifier for Recorder {
    fn notify(&self, notification: &Notification, _: Duration) -> Result<(), DaemonError> {
        self.seen.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    controller: Controller,
    notes: Arc<Recorder>,
}

impl Fixture {
    /// Vault with a database and a sync script; the script appends to `sync.log`.
    fn new(script: &str, sync_timeout: Duration) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let database = dir.path().join("Passwords.kdbx");
        fs::write(&database, b"kdbx").expect("write database");
        set_mtime(&database, 0);

        let script_path = dir.path().join("sync-keepass.sh");
        fs::write(&script_path, format!("echo run >> sync.log\n{script}\n")).expect("script");

        let config = SyncConfig {
            poll_interval: INTERVAL,
            sync_timeout,
            notifications_enabled: true,
            notification_timeout: Duration::from_secs(1),
        };
        let target = WatchTarget {
            database,
            working_dir: dir.path().to_path_buf(),
            command: SyncCommand::new("sh", [script_path.into_os_string()]),
        };
        let notes = Arc::new(Recorder::default());
        let controller = Controller::new(config, target, notes.clone());
        Self {
            dir,
            controller,
            notes,
        }
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("Passwords.kdbx")
    }

    fn runs(&self) -> usize {
        fs::read_to_string(self.dir.path().join("sync.log"))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }
}

fn set_mtime(path: &Path, offset: i64) -> SystemTime {
    filetime::set_file_mtime(path, FileTime::from_unix_time(BASE_MTIME + offset, 0))
        .expect("set mtime");
    fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("read mtime")
}

async fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    done()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn change_triggers_one_sync_and_moves_baseline() {
    let fx = Fixture::new("exit 0", Duration::from_secs(5));
    assert!(fx.controller.start().await);

    let touched = set_mtime(&fx.database(), 100);
    let synced = wait_until(Duration::from_secs(5), || {
        fx.notes
            .messages()
            .contains(&"Database synchronized successfully".to_string())
    })
    .await;
    assert!(synced, "sync never reported: {:?}", fx.notes.messages());

    tokio::time::sleep(INTERVAL * 6).await;
    assert_eq!(fx.runs(), 1, "exactly one attempt per change");

    let state = fx.controller.snapshot();
    assert_eq!(state.sync_count, 1);
    assert!(state.last_sync_time.is_some());
    assert_eq!(state.last_known_mtime, Some(touched));

    let status = fx.controller.status();
    assert_eq!(status.last_sync_relative.as_deref(), Some("Just now"));
    fx.controller.stop().await;
}

#[tokio::test]
async fn unchanged_file_never_syncs() {
    let fx = Fixture::new("exit 0", Duration::from_secs(5));
    fx.controller.start().await;
    tokio::time::sleep(INTERVAL * 10).await;

    assert_eq!(fx.runs(), 0);
    assert_eq!(fx.controller.status().sync_count, 0);
    assert_eq!(fx.notes.messages(), vec!["Monitoring started".to_string()]);
    fx.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_reports_once_and_keeps_count() {
    let fx = Fixture::new("sleep 2", Duration::from_millis(200));
    fx.controller.start().await;
    set_mtime(&fx.database(), 100);

    let reported = wait_until(Duration::from_secs(5), || !fx.notes.critical().is_empty()).await;
    assert!(reported, "no timeout notification");

    tokio::time::sleep(INTERVAL * 6).await;
    let critical = fx.notes.critical();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].title, "KeePass Sync Error");
    assert_eq!(critical[0].message, "Sync timed out");
    assert_eq!(fx.controller.status().sync_count, 0);
    assert_eq!(fx.runs(), 1, "the timed-out change is not retried");
    fx.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_script_reports_exit_code() {
    let fx = Fixture::new("echo 'rejected' >&2; exit 3", Duration::from_secs(5));
    fx.controller.start().await;
    set_mtime(&fx.database(), 100);

    let reported = wait_until(Duration::from_secs(5), || !fx.notes.critical().is_empty()).await;
    assert!(reported);
    assert_eq!(
        fx.notes.critical()[0].message,
        "Sync failed (code 3) - check logs"
    );
    assert_eq!(fx.controller.status().sync_count, 0);
    assert!(fx.controller.is_running(), "a failed sync never stops the loop");
    fx.controller.stop().await;
}

#[tokio::test]
async fn stop_then_start_reads_fresh_baseline() {
    let fx = Fixture::new("exit 0", Duration::from_secs(5));
    fx.controller.start().await;
    assert!(fx.controller.stop().await);

    let edited_while_stopped = set_mtime(&fx.database(), 100);
    assert!(fx.controller.start().await);
    assert_eq!(
        fx.controller.snapshot().last_known_mtime,
        Some(edited_while_stopped)
    );

    tokio::time::sleep(INTERVAL * 6).await;
    assert_eq!(fx.runs(), 0, "edits made while stopped are not synced");
    fx.controller.stop().await;

    assert_eq!(
        fx.notes.messages(),
        vec![
            "Monitoring started",
            "Monitoring stopped",
            "Monitoring started",
            "Monitoring stopped",
        ]
    );
}

#[tokio::test]
async fn sync_now_runs_out_of_band() {
    let fx = Fixture::new("exit 0", Duration::from_secs(5));
    let err = fx.controller.sync_now().await.expect_err("stopped");
    assert!(matches!(err, DaemonError::WatcherStopped));
    assert_eq!(fx.runs(), 0);

    fx.controller.start().await;
    let outcome = fx.controller.sync_now().await.expect("running");
    assert!(outcome.is_success());
    assert_eq!(fx.controller.status().sync_count, 1);
    assert_eq!(fx.runs(), 1);
    fx.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_does_not_cancel_in_flight_sync() {
    let fx = Fixture::new("sleep 0.5; touch done", Duration::from_secs(5));
    fx.controller.start().await;
    set_mtime(&fx.database(), 100);

    let syncing = wait_until(Duration::from_secs(5), || fx.controller.status().syncing).await;
    assert!(syncing, "sync never started");

    assert!(fx.controller.stop().await);
    let finished = wait_until(Duration::from_secs(5), || {
        fx.dir.path().join("done").exists()
    })
    .await;
    assert!(finished, "in-flight sync was cancelled");

    let recorded = wait_until(Duration::from_secs(2), || {
        fx.controller.status().sync_count == 1
    })
    .await;
    assert!(recorded);
    assert!(!fx.controller.is_running());
}

#[tokio::test]
async fn missing_database_is_not_fatal() {
    let fx = Fixture::new("exit 0", Duration::from_secs(5));
    fs::remove_file(fx.database()).expect("remove database");
    fx.controller.start().await;
    tokio::time::sleep(INTERVAL * 4).await;

    assert!(fx.controller.is_running());
    assert_eq!(fx.runs(), 0);

    fs::write(fx.database(), b"kdbx").expect("recreate database");
    let synced = wait_until(Duration::from_secs(5), || fx.runs() == 1).await;
    assert!(synced, "reappearing database counts as a change");
    fx.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn attempts_never_overlap_across_loop_and_sync_now() {
    let fx = Fixture::new(
        "echo begin >> trace.log; sleep 0.3; echo end >> trace.log",
        Duration::from_secs(5),
    );
    fx.controller.start().await;
    set_mtime(&fx.database(), 100);

    let syncing = wait_until(Duration::from_secs(5), || fx.controller.status().syncing).await;
    assert!(syncing, "sync never started");

    let edited_mid_sync = set_mtime(&fx.database(), 200);
    let manual = {
        let controller = fx.controller.clone();
        tokio::spawn(async move { controller.sync_now().await })
    };

    let outcome = manual.await.expect("join").expect("sync now while running");
    assert!(outcome.is_success());
    let all_recorded = wait_until(Duration::from_secs(5), || {
        fx.controller.status().sync_count == 3
    })
    .await;
    assert!(all_recorded, "expected 3 attempts, saw {}", fx.runs());

    tokio::time::sleep(INTERVAL * 6).await;
    assert_eq!(fx.runs(), 3, "the mid-sync edit is synced exactly once");
    assert_eq!(fx.controller.snapshot().last_known_mtime, Some(edited_mid_sync));

    let trace = fs::read_to_string(fx.dir.path().join("trace.log")).expect("trace");
    let markers: Vec<&str> = trace.lines().collect();
    assert_eq!(
        markers,
        ["begin", "end", "begin", "end", "begin", "end"],
        "attempts interleaved"
    );
    fx.controller.stop().await;
}
