//! Change detection tests driven by explicit mtimes.
//!
//! Every test gets its own `TempDir`; timestamps are set with `filetime` so
//! nothing depends on filesystem timestamp granularity.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use keepsync_detector::{ChangeDetector, Tick};
use rstest::rstest;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn database(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("Passwords.kdbx");
    fs::write(&path, b"KDBX").expect("write database");
    path
}

fn set_mtime(path: &PathBuf, secs_from_epoch: u64) -> SystemTime {
    let at = SystemTime::UNIX_EPOCH + Duration::from_secs(secs_from_epoch);
    set_file_mtime(path, FileTime::from_system_time(at)).expect("set mtime");
    at
}

// ---------------------------------------------------------------------------
// Baseline and change
// ---------------------------------------------------------------------------

#[rstest]
#[case(1)]
#[case(5)]
#[case(50)]
fn unchanged_timestamp_never_reports_change(#[case] ticks: usize) {
    let dir = TempDir::new().expect("tempdir");
    let path = database(&dir);
    set_mtime(&path, 1_700_000_000);

    let mut detector = ChangeDetector::new(&path);
    for _ in 0..ticks {
        assert!(matches!(detector.poll(), Tick::Unchanged));
    }
}

#[test]
fn touched_file_reports_change_until_acknowledged() {
    let dir = TempDir::new().expect("tempdir");
    let path = database(&dir);
    let initial = set_mtime(&path, 1_700_000_000);

    let mut detector = ChangeDetector::new(&path);
    assert_eq!(detector.baseline(), Some(initial));

    let touched = set_mtime(&path, 1_700_000_060);
    match detector.poll() {
        Tick::Changed { mtime } => assert_eq!(mtime, touched),
        other => panic!("expected change, got {other:?}"),
    }
    // Without acknowledgement the same change is seen again.
    assert!(matches!(detector.poll(), Tick::Changed { .. }));

    detector.acknowledge(touched);
    assert_eq!(detector.baseline(), Some(touched));
    assert!(matches!(detector.poll(), Tick::Unchanged));
}

#[test]
fn older_timestamp_also_counts_as_change() {
    let dir = TempDir::new().expect("tempdir");
    let path = database(&dir);
    set_mtime(&path, 1_700_000_000);
    let mut detector = ChangeDetector::new(&path);

    set_mtime(&path, 1_600_000_000);
    assert!(matches!(detector.poll(), Tick::Changed { .. }));
}

#[test]
fn file_appearing_after_start_is_a_change() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("Passwords.kdbx");
    let mut detector = ChangeDetector::new(&path);
    assert!(detector.baseline().is_none());

    fs::write(&path, b"KDBX").expect("write database");
    assert!(matches!(detector.poll(), Tick::Changed { .. }));
}

// ---------------------------------------------------------------------------
// Unavailable file
// ---------------------------------------------------------------------------

#[test]
fn missing_file_is_reported_once_per_occurrence() {
    let dir = TempDir::new().expect("tempdir");
    let path = database(&dir);
    let initial = set_mtime(&path, 1_700_000_000);
    let mut detector = ChangeDetector::new(&path);

    fs::remove_file(&path).expect("remove");
    let reports: Vec<bool> = (0..3)
        .map(|_| match detector.poll() {
            Tick::Unavailable { first_report, .. } => first_report,
            other => panic!("expected unavailable, got {other:?}"),
        })
        .collect();
    assert_eq!(reports, vec![true, false, false]);
    assert_eq!(detector.baseline(), Some(initial), "baseline survives outage");

    // Restored with the same timestamp: no change, and the next outage is new.
    fs::write(&path, b"KDBX").expect("restore");
    set_mtime(&path, 1_700_000_000);
    assert!(matches!(detector.poll(), Tick::Unchanged));

    fs::remove_file(&path).expect("remove again");
    assert!(matches!(
        detector.poll(),
        Tick::Unavailable {
            first_report: true,
            ..
        }
    ));
}
