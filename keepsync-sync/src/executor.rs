//! Bounded-time execution of the sync command.
//!
//! Every attempt produces exactly one [`SyncOutcome`]. Attempts on the same
//! [`SyncExecutor`] are serialized, so two triggers never run the command
//! concurrently against the same working directory.

use std::path::Path;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

use crate::command::SyncCommand;
use crate::error::SyncError;

/// Classified result of one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The command ran to completion. `success` is `exit_code == 0`.
    Finished {
        success: bool,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    /// The command exceeded its timeout and was killed.
    TimedOut { timeout_ms: u64 },
    /// The command could not be launched or waited on.
    ExecutionError { message: String },
}

impl SyncOutcome {
    fn finished(exit_code: i32, stdout: String, stderr: String) -> Self {
        SyncOutcome::Finished {
            success: exit_code == 0,
            exit_code,
            stdout,
            stderr,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Finished { success: true, .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SyncOutcome::Finished { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// Runs sync commands one at a time.
#[derive(Debug, Default)]
pub struct SyncExecutor {
    gate: Mutex<()>,
}

impl SyncExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `command` in `working_dir`, killing it after `timeout`.
    ///
    /// Waits for any attempt already in flight on this executor before
    /// starting; the timeout only covers the command itself.
    pub async fn execute(
        &self,
        command: &SyncCommand,
        working_dir: &Path,
        timeout: Duration,
    ) -> SyncOutcome {
        let _turn = self.gate.lock().await;
        let started = Instant::now();
        tracing::info!(
            "running sync command `{command}` in {}",
            working_dir.display()
        );

        let outcome = match run_child(command, working_dir, timeout).await {
            Ok(outcome) => outcome,
            Err(err) => SyncOutcome::ExecutionError {
                message: err.to_string(),
            },
        };

        match &outcome {
            SyncOutcome::Finished {
                success: true,
                stdout,
                ..
            } => {
                tracing::info!(
                    "sync command succeeded in {} ms",
                    started.elapsed().as_millis()
                );
                tracing::debug!("sync stdout: {}", stdout.trim_end());
            }
            SyncOutcome::Finished {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                tracing::warn!("sync command failed with exit code {exit_code}");
                tracing::warn!("sync stderr: {}", stderr.trim_end());
                tracing::debug!("sync stdout: {}", stdout.trim_end());
            }
            SyncOutcome::TimedOut { timeout_ms } => {
                tracing::error!("sync command timed out after {timeout_ms} ms and was killed");
            }
            SyncOutcome::ExecutionError { message } => {
                tracing::error!("sync command could not run: {message}");
            }
        }
        outcome
    }
}

async fn run_child(
    command: &SyncCommand,
    working_dir: &Path,
    timeout: Duration,
) -> Result<SyncOutcome, SyncError> {
    let mut child = command
        .to_command(working_dir)
        .spawn()
        .map_err(|source| SyncError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let waited = {
        let wait = async { tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr)) };
        tokio::time::timeout(timeout, wait).await
    };

    match waited {
        Ok((Ok(status), stdout, stderr)) => {
            Ok(SyncOutcome::finished(exit_code(status), stdout, stderr))
        }
        Ok((Err(source), _, _)) => Err(SyncError::Wait {
            command: command.to_string(),
            source,
        }),
        Err(_elapsed) => {
            // kill() also reaps the child.
            if let Err(err) = child.kill().await {
                tracing::warn!("failed to kill timed-out sync command: {err}");
            }
            Ok(SyncOutcome::TimedOut {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(err) = pipe.read_to_end(&mut buf).await {
            tracing::debug!("error reading sync command output: {err}");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Exit code of a finished child. A child killed by signal `N` reports `-N`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_exit_code_zero() {
        assert!(SyncOutcome::finished(0, String::new(), String::new()).is_success());
        let failed = SyncOutcome::finished(2, String::new(), "boom".to_string());
        assert!(!failed.is_success());
        assert_eq!(failed.exit_code(), Some(2));
    }

    #[test]
    fn timeout_and_errors_are_failures() {
        assert!(!SyncOutcome::TimedOut { timeout_ms: 10 }.is_success());
        let err = SyncOutcome::ExecutionError {
            message: "no such file".to_string(),
        };
        assert!(!err.is_success());
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let json = serde_json::to_value(SyncOutcome::TimedOut { timeout_ms: 5000 }).expect("json");
        assert_eq!(json["kind"], "timed_out");
        assert_eq!(json["timeout_ms"], 5000);
    }
}
