//! keepsync: watch a KeePass database and sync it through git when it changes.
//!
//! # Usage
//!
//! ```text
//! keepsync [--config <path>]      monitor in the foreground (starts immediately)
//! keepsync --create-config        write a default config.json and exit
//! keepsync --setup                prepare the current directory and exit
//! keepsync start|stop|sync-now|status [--json]|last-sync|quit
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::status::StatusArgs;
use keepsync_core::Layout;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "keepsync",
    version,
    about = "Sync a KeePass database through git whenever it changes",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
struct Cli {
    /// Path to config.json. Its directory becomes the base directory.
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write a default config.json in the current directory and exit.
    #[arg(long, conflicts_with = "setup")]
    create_config: bool,

    /// Prepare the base directory (config, .gitignore, checks) and exit.
    #[arg(long)]
    setup: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Commands sent to a running instance.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resume monitoring.
    Start,
    /// Pause monitoring.
    Stop,
    /// Run the sync script now.
    SyncNow,
    /// Show monitoring status.
    Status(StatusArgs),
    /// Show when the last successful sync happened.
    LastSync,
    /// Shut the running instance down.
    Quit,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("could not determine current directory")?;

    if cli.create_config {
        return commands::setup::create_config(&cwd);
    }

    let layout = Layout::resolve(cli.config.as_deref(), &cwd);
    if cli.setup {
        return commands::setup::run(&layout.base_dir);
    }

    match cli.command {
        None => commands::run::run(layout),
        Some(Commands::Start) => commands::control::start(),
        Some(Commands::Stop) => commands::control::stop(),
        Some(Commands::SyncNow) => commands::control::sync_now(),
        Some(Commands::Status(args)) => args.run(),
        Some(Commands::LastSync) => commands::control::last_sync(),
        Some(Commands::Quit) => commands::control::quit(),
    }
}
