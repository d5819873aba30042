//! `keepsync [--config <path>]`: monitor in the foreground.

use std::sync::Arc;

use anyhow::{Context, Result};

use keepsync_core::Layout;
use keepsync_daemon::{start_blocking, DesktopNotifier, RunOptions};

pub fn run(layout: Layout) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    println!("KeePass Auto-Sync");
    println!("  Base directory: {}", layout.base_dir.display());
    println!("  Config file:    {}", layout.config_path.display());
    println!("  Control with `keepsync status`, `keepsync sync-now`, `keepsync quit`.");

    start_blocking(RunOptions { home, layout }, Arc::new(DesktopNotifier))
        .context("keepsync exited with error")
}
