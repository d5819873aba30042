use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use keepsync_core::{config, ConfigError, Layout, Settings};
use keepsync_sync::SyncCommand;

use crate::controller::{Controller, WatchTarget};
use crate::error::{io_err, DaemonError};
use crate::notifier::Notifier;
use crate::paths::{keepsync_root, SHUTDOWN_TIMEOUT};
#[cfg(unix)]
use crate::paths::socket_path;
use crate::protocol::{ControlCommand, ControlResponse};

/// Everything needed to launch one watcher instance.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Home directory holding `.keepsync/` (the control socket).
    pub home: PathBuf,
    pub layout: Layout,
}

/// Start the runtime and block the current thread until it exits.
pub fn start_blocking(options: RunOptions, notifier: Arc<dyn Notifier>) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let result = runtime.block_on(run(options, notifier));
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

/// Load settings, build the controller, and serve until quit or ctrl-c.
pub async fn run(options: RunOptions, notifier: Arc<dyn Notifier>) -> Result<(), DaemonError> {
    let settings = load_settings(&options.layout);
    let controller = Controller::new(
        settings.sync_config(),
        watch_target(&options.layout, &settings),
        notifier,
    );
    serve(&options.home, controller).await
}

/// Settings from `layout.config_path`, or defaults when missing or invalid.
pub fn load_settings(layout: &Layout) -> Settings {
    match config::load_at(&layout.config_path) {
        Ok(settings) => {
            tracing::info!(config = %layout.config_path.display(), "configuration loaded");
            settings
        }
        Err(ConfigError::NotFound { path }) => {
            tracing::info!(config = %path.display(), "no configuration file; using defaults");
            Settings::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "invalid configuration; using defaults");
            Settings::default()
        }
    }
}

pub fn watch_target(layout: &Layout, settings: &Settings) -> WatchTarget {
    WatchTarget {
        database: layout.database_path(settings),
        working_dir: layout.base_dir.clone(),
        command: SyncCommand::resolve(&layout.base_dir, settings.sync.script.as_deref()),
    }
}

/// Open the control channel, start monitoring, and run until a `quit`
/// request or ctrl-c. Monitoring is stopped (bounded) on the way out.
pub async fn serve(home: &Path, controller: Controller) -> Result<(), DaemonError> {
    let root = keepsync_root(home);
    fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;

    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    let control_handle = control_channel(home, &controller, &shutdown_tx).await?;

    controller.start().await;

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (control_result, signal_result) = tokio::join!(control_handle, signal_handle);

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, controller.stop())
        .await
        .is_err()
    {
        tracing::warn!("monitoring did not stop in time; exiting anyway");
    }

    joined("control_channel", control_result)?;
    joined("signal_handler", signal_result)?;
    Ok(())
}

type TaskHandle = JoinHandle<Result<(), DaemonError>>;

#[cfg(unix)]
async fn control_channel(
    home: &Path,
    controller: &Controller,
    shutdown: &broadcast::Sender<()>,
) -> Result<TaskHandle, DaemonError> {
    crate::socket::listen(&socket_path(home), controller.clone(), shutdown.clone()).await
}

#[cfg(not(unix))]
async fn control_channel(
    _home: &Path,
    _controller: &Controller,
    shutdown: &broadcast::Sender<()>,
) -> Result<TaskHandle, DaemonError> {
    tracing::warn!("no control socket on this platform; stop keepsync with ctrl-c");
    Ok(idle_until_shutdown(shutdown))
}

/// Stand-in for the control channel: a task that ends with the runtime.
#[cfg_attr(unix, allow(dead_code))]
fn idle_until_shutdown(shutdown: &broadcast::Sender<()>) -> TaskHandle {
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = shutdown_rx.recv().await;
        Ok(())
    })
}

/// Apply one control command to `controller`.
///
/// `quit` only acknowledges; shutting down is up to the caller.
pub async fn dispatch(controller: &Controller, command: ControlCommand) -> ControlResponse {
    match command {
        ControlCommand::Start => {
            let started = controller.start().await;
            ControlResponse::ok(json!({ "started": started, "running": controller.is_running() }))
        }
        ControlCommand::Stop => {
            let stopped = controller.stop().await;
            ControlResponse::ok(json!({ "stopped": stopped, "running": controller.is_running() }))
        }
        ControlCommand::SyncNow => match controller.sync_now().await {
            Ok(outcome) => payload(&outcome),
            Err(err) => ControlResponse::error(err.to_string()),
        },
        ControlCommand::Status => {
            let summary = controller.status();
            match serde_json::to_value(&summary) {
                Ok(status) => ControlResponse::ok(json!({
                    "message": summary.message(),
                    "status": status,
                })),
                Err(err) => ControlResponse::error(err.to_string()),
            }
        }
        ControlCommand::LastSync => ControlResponse::ok(json!({
            "message": controller.last_sync_message(),
        })),
        ControlCommand::Quit => ControlResponse::ok(json!({ "quitting": true })),
    }
}

fn payload<T: Serialize>(value: &T) -> ControlResponse {
    match serde_json::to_value(value) {
        Ok(data) => ControlResponse::ok(data),
        Err(err) => ControlResponse::error(err.to_string()),
    }
}

fn joined(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    result.map_err(|err| DaemonError::Protocol(format!("{task} task panicked or was cancelled: {err}")))?
}

/// Install the global `fmt` subscriber (`RUST_LOG`, default `info`).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
