use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const SOCKET_NAME: &str = "wallfit.sock";

/// A status request may wait for a rescan or a round of swww calls.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpcCommand {
    /// Pick new wallpapers even where the current one still fits.
    Change,
    /// Re-run the assignment without forcing a change.
    Apply,
    Rescan,
    Reload,
    Status,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum IpcResponse {
    Success { message: String },
    Error { message: String },
    Status {
        outputs: Vec<OutputStatus>,
        catalog_size: usize,
        auto_change_remaining: Option<u64>, // seconds
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputStatus {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub current_image: Option<String>,
    pub eligible: usize,
    pub last_outcome: String,
}

pub fn socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(SOCKET_NAME)
}

// Each message is one JSON document on its own line.
fn write_message<T: Serialize>(stream: &mut UnixStream, message: &T) -> Result<()> {
    let mut line = serde_json::to_vec(message).context("Cannot encode IPC message")?;
    line.push(b'\n');
    stream.write_all(&line).context("Cannot write to IPC socket")?;
    stream.flush().context("Cannot write to IPC socket")
}

fn read_message<T: DeserializeOwned>(reader: &mut impl BufRead) -> Result<T> {
    let mut line = String::new();
    if reader.read_line(&mut line).context("Cannot read from IPC socket")? == 0 {
        return Err(anyhow!("IPC peer closed the connection without a message"));
    }
    serde_json::from_str(line.trim_end()).with_context(|| format!("Malformed IPC message: {}", line.trim_end()))
}

pub struct IpcClient {
    socket_path: PathBuf,
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl IpcClient {
    pub fn new() -> Self {
        Self { socket_path: socket_path() }
    }

    pub fn with_socket(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    /// True when something accepts connections on the socket. A stale socket
    /// file left by a crashed daemon refuses the connection.
    pub fn is_daemon_running(&self) -> bool {
        UnixStream::connect(&self.socket_path).is_ok()
    }

    pub fn send_command(&self, command: IpcCommand) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .with_context(|| format!("No wallfit daemon listening on {:?}", self.socket_path))?;
        stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;

        write_message(&mut stream, &command)?;
        read_message(&mut BufReader::new(stream))
    }
}

pub struct IpcServer {
    socket_path: PathBuf,
}

impl Default for IpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl IpcServer {
    pub fn new() -> Self {
        Self { socket_path: socket_path() }
    }

    pub fn with_socket(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Binds the socket, replacing a stale one.
    pub fn bind(&self) -> Result<UnixListener> {
        if let Some(dir) = self.socket_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create runtime directory {:?}", dir))?;
        }
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => log::debug!("Removed stale socket {:?}", self.socket_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("Cannot replace socket {:?}", self.socket_path)),
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Cannot listen on {:?}", self.socket_path))?;
        log::info!("Listening for commands on {:?}", self.socket_path);
        Ok(listener)
    }

    /// Serves connections until the listener fails, one thread per client.
    pub fn serve<F>(listener: UnixListener, handler: F)
    where
        F: Fn(IpcCommand) -> Result<IpcResponse> + Send + Clone + 'static,
    {
        for incoming in listener.incoming() {
            let stream = match incoming {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("Dropped an IPC client: {}", e);
                    continue;
                }
            };
            let handler = handler.clone();
            std::thread::spawn(move || {
                if let Err(e) = Self::answer(stream, &handler) {
                    log::warn!("IPC exchange failed: {:#}", e);
                }
            });
        }
    }

    fn answer<F>(mut stream: UnixStream, handler: &F) -> Result<()>
    where
        F: Fn(IpcCommand) -> Result<IpcResponse>,
    {
        let mut reader = BufReader::new(stream.try_clone()?);
        let response = match read_message::<IpcCommand>(&mut reader) {
            Ok(command) => {
                log::debug!("IPC command: {:?}", command);
                handler(command).unwrap_or_else(|e| IpcResponse::Error { message: format!("{:#}", e) })
            }
            Err(e) => IpcResponse::Error { message: format!("{:#}", e) },
        };
        write_message(&mut stream, &response)
    }
}
