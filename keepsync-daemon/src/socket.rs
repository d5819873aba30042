//! Control socket server: one JSON request per line in, one response per
//! line out. Unix only.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::controller::Controller;
use crate::error::{io_err, DaemonError};
use crate::protocol::{ControlCommand, ControlRequest, ControlResponse};
use crate::runtime::dispatch;

/// Bind `socket` and serve control clients until `shutdown` fires.
///
/// The socket file is owner-only while bound and removed when the task ends.
/// The task broadcasts `shutdown` itself on exit so the rest of the runtime
/// follows it down.
pub(crate) async fn listen(
    socket: &Path,
    controller: Controller,
    shutdown: broadcast::Sender<()>,
) -> Result<JoinHandle<Result<(), DaemonError>>, DaemonError> {
    claim(socket).await?;
    let listener = UnixListener::bind(socket).map_err(|e| io_err(socket, e))?;
    fs::set_permissions(socket, fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(socket, e))?;
    tracing::info!(socket = %socket.display(), "control socket listening");

    let shutdown_rx = shutdown.subscribe();
    let socket = socket.to_path_buf();
    Ok(tokio::spawn(async move {
        let result = accept_loop(&listener, &controller, &shutdown, shutdown_rx).await;
        drop(listener);
        match fs::remove_file(&socket) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(socket = %socket.display(), error = %err, "socket cleanup failed"),
        }
        let _ = shutdown.send(());
        result.map_err(|e| io_err(&socket, e))
    }))
}

async fn accept_loop(
    listener: &UnixListener,
    controller: &Controller,
    shutdown: &broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    loop {
        let (stream, _) = tokio::select! {
            _ = shutdown_rx.recv() => return Ok(()),
            accepted = listener.accept() => accepted?,
        };
        let controller = controller.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_client(stream, &controller, &shutdown).await {
                tracing::error!(error = %err, "control client error");
            }
        });
    }
}

async fn serve_client(
    stream: UnixStream,
    controller: &Controller,
    shutdown: &broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("control socket read", e))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, quit) = match serde_json::from_str::<ControlRequest>(line) {
            Ok(request) => {
                tracing::debug!(cmd = %request.cmd, "control command");
                let quit = request.cmd == ControlCommand::Quit;
                (dispatch(controller, request.cmd).await, quit)
            }
            Err(err) => (
                ControlResponse::error(format!("invalid request JSON: {err}")),
                false,
            ),
        };

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer
            .write_all(&encoded)
            .await
            .map_err(|e| io_err("control socket write", e))?;

        if quit {
            tracing::info!("quit requested");
            let _ = shutdown.send(());
            break;
        }
    }

    Ok(())
}

/// Clear a leftover socket file. A socket that still accepts connections
/// belongs to a live instance and is left alone.
async fn claim(socket: &Path) -> Result<(), DaemonError> {
    if UnixStream::connect(socket).await.is_ok() {
        return Err(DaemonError::AlreadyRunning {
            socket: socket.to_path_buf(),
        });
    }
    match fs::remove_file(socket) {
        Ok(()) => {
            tracing::warn!(socket = %socket.display(), "removed stale control socket");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}
