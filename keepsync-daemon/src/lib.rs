//! keepsync watcher runtime: state tracker, monitoring loop, notifier, and
//! the control channel (a Unix socket; elsewhere the runtime only answers
//! ctrl-c).

pub mod controller;
mod error;
pub mod notifier;
pub mod paths;
pub mod protocol;
mod runtime;
#[cfg(unix)]
mod socket;
pub mod state;
mod watch;

pub use controller::{Controller, WatchTarget};
pub use error::DaemonError;
pub use notifier::{DesktopNotifier, Notification, Notifier, Urgency};
pub use protocol::{request, ControlCommand, ControlRequest, ControlResponse};
pub use runtime::{
    dispatch, init_tracing, load_settings, run, serve, start_blocking, watch_target, RunOptions,
};
pub use state::{IndicatorColor, StatusSummary, WatchState};
