//! Control commands for a running instance, sent over the Unix socket.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::Value;

use keepsync_daemon::{request, ControlCommand, DaemonError};
use keepsync_sync::SyncOutcome;

pub const NOT_RUNNING: &str = "keepsync is not running";

/// Send `command`; `None` when no instance is listening.
pub fn send(command: ControlCommand) -> Result<Option<Value>> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    match request(&home, command) {
        Ok(data) => Ok(Some(data)),
        Err(DaemonError::DaemonNotRunning { .. }) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("`{command}` request failed")),
    }
}

pub fn start() -> Result<()> {
    let Some(data) = send(ControlCommand::Start)? else {
        println!("{NOT_RUNNING}");
        return Ok(());
    };
    if flag(&data, "started") {
        println!("{} Monitoring started", "✓".green());
    } else {
        println!("Monitoring already running");
    }
    Ok(())
}

pub fn stop() -> Result<()> {
    let Some(data) = send(ControlCommand::Stop)? else {
        println!("{NOT_RUNNING}");
        return Ok(());
    };
    if flag(&data, "stopped") {
        println!("{} Monitoring stopped", "✓".green());
    } else {
        println!("Monitoring already stopped");
    }
    Ok(())
}

pub fn sync_now() -> Result<()> {
    let Some(data) = send(ControlCommand::SyncNow)? else {
        println!("{NOT_RUNNING}");
        return Ok(());
    };
    let outcome: SyncOutcome =
        serde_json::from_value(data).context("unexpected sync-now response")?;

    match outcome {
        SyncOutcome::Finished { success: true, .. } => {
            println!("{} Database synchronized successfully", "✓".green());
            Ok(())
        }
        SyncOutcome::Finished {
            exit_code, stderr, ..
        } => {
            println!("{} Sync failed (code {exit_code})", "✗".red());
            if !stderr.trim().is_empty() {
                eprintln!("{}", stderr.trim_end());
            }
            bail!("sync script exited with code {exit_code}")
        }
        SyncOutcome::TimedOut { timeout_ms } => {
            println!("{} Sync timed out", "✗".red());
            bail!("sync script killed after {timeout_ms} ms")
        }
        SyncOutcome::ExecutionError { message } => {
            println!("{} Error: {message}", "✗".red());
            bail!("sync script could not run")
        }
    }
}

pub fn last_sync() -> Result<()> {
    let Some(data) = send(ControlCommand::LastSync)? else {
        println!("{NOT_RUNNING}");
        return Ok(());
    };
    println!("{}", data["message"].as_str().unwrap_or("No syncs yet"));
    Ok(())
}

pub fn quit() -> Result<()> {
    match send(ControlCommand::Quit)? {
        Some(_) => println!("keepsync is shutting down"),
        None => println!("{NOT_RUNNING}"),
    }
    Ok(())
}

fn flag(data: &Value, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}
