use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "KeePass Sync";
pub const CONTROL_SOCKET: &str = "keepsync.sock";

/// Upper bound on waiting for the monitoring loop to exit after a stop.
pub const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Upper bound on the whole shutdown sequence after quit or ctrl-c.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn keepsync_root(home: &Path) -> PathBuf {
    home.join(".keepsync")
}

pub fn socket_path(home: &Path) -> PathBuf {
    keepsync_root(home).join(CONTROL_SOCKET)
}
