use std::fmt;
#[cfg(unix)]
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(unix)]
use crate::error::io_err;
use crate::error::DaemonError;
use crate::paths::socket_path;

/// Commands accepted on the control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    Start,
    Stop,
    SyncNow,
    Status,
    LastSync,
    Quit,
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlCommand::Start => "start",
            ControlCommand::Stop => "stop",
            ControlCommand::SyncNow => "sync_now",
            ControlCommand::Status => "status",
            ControlCommand::LastSync => "last_sync",
            ControlCommand::Quit => "quit",
        };
        f.write_str(name)
    }
}

/// JSON newline-delimited request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub cmd: ControlCommand,
}

/// JSON newline-delimited response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Send `command` to the instance listening under `home` and unwrap the
/// response payload.
///
/// `status` retries briefly while nothing is listening yet, so it can be
/// issued right after launching an instance.
pub fn request(home: &Path, command: ControlCommand) -> Result<Value, DaemonError> {
    let socket = socket_path(home);
    let request = ControlRequest { cmd: command };
    let retries = if command == ControlCommand::Status { 4 } else { 0 };

    let mut attempt = 0;
    loop {
        match exchange(&socket, &request) {
            Err(DaemonError::DaemonNotRunning { .. }) if attempt < retries => {
                attempt += 1;
                sleep(STATUS_RETRY_DELAY);
            }
            result => return result.and_then(response_into_data),
        }
    }
}

const STATUS_RETRY_DELAY: Duration = Duration::from_millis(100);

#[cfg(unix)]
fn exchange(socket: &Path, request: &ControlRequest) -> Result<ControlResponse, DaemonError> {
    use std::io::ErrorKind;
    use std::os::unix::net::UnixStream;

    let mut stream = UnixStream::connect(socket).map_err(|err| match err.kind() {
        ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
            DaemonError::DaemonNotRunning {
                socket: socket.to_path_buf(),
            }
        }
        _ => io_err(socket, err),
    })?;

    let mut line = serde_json::to_vec(request)?;
    line.push(b'\n');
    stream.write_all(&line).map_err(|e| io_err(socket, e))?;

    let mut reply = String::new();
    BufReader::new(&stream)
        .read_line(&mut reply)
        .map_err(|e| io_err(socket, e))?;
    if reply.is_empty() {
        return Err(DaemonError::Protocol(
            "keepsync closed connection before responding".to_string(),
        ));
    }
    Ok(serde_json::from_str(reply.trim_end())?)
}

#[cfg(not(unix))]
fn exchange(_socket: &Path, _request: &ControlRequest) -> Result<ControlResponse, DaemonError> {
    Err(DaemonError::ControlUnavailable)
}

fn response_into_data(response: ControlResponse) -> Result<Value, DaemonError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(DaemonError::Protocol(
            response
                .error
                .unwrap_or_else(|| "unknown keepsync error".to_string()),
        ))
    }
}
