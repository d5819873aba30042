//! `keepsync status [--json]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;

use keepsync_daemon::{ControlCommand, IndicatorColor, StatusSummary};

use super::control::{send, NOT_RUNNING};

/// Arguments for `keepsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let Some(data) = send(ControlCommand::Status)? else {
            if self.json {
                println!("{}", json!({ "running": false }));
            } else {
                println!("{NOT_RUNNING}");
            }
            return Ok(());
        };

        let summary: StatusSummary = serde_json::from_value(data["status"].clone())
            .context("unexpected status response")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to render status JSON")?
            );
            return Ok(());
        }

        println!("{} {}", indicator(summary.indicator), summary.database.display());
        println!("{}", summary.message());
        if let Some(relative) = &summary.last_sync_relative {
            println!("({relative})");
        }
        Ok(())
    }
}

fn indicator(color: IndicatorColor) -> String {
    match color {
        IndicatorColor::Idle => "■".green().bold().to_string(),
        IndicatorColor::Syncing => "■".yellow().bold().to_string(),
        IndicatorColor::Stopped => "■".dimmed().to_string(),
    }
}
