use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use wallfit_common::{
    locate_swww, CommandBuilder, ErrorReporting, IpcClient, IpcCommand, IpcResponse, IpcServer,
    ProcessExecutor,
};
use wallfit_config::Config;

mod daemon;

use daemon::{Daemon, Trigger};

/// Copies every log line to stderr and to the debug log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()?;
        self.file.flush()
    }
}

fn log_file_path() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("wallfit")
        .join("wallfit.log")
}

fn init_logging(debug_log: bool) {
    let default_level = if debug_log { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if debug_log {
        let path = log_file_path();
        let file = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(&path));
        match file {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
            }
            Err(e) => eprintln!("wallfit: cannot open log file {:?}: {}", path, e),
        }
    }

    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger depends on the config, so its problems are reported once
    // logging is up.
    let loaded = Config::load();
    init_logging(loaded.as_ref().map(|c| c.general.debug_log).unwrap_or(false));

    let client = IpcClient::new();
    if client.is_daemon_running() {
        log::info!("wallfit daemon already running; requesting a wallpaper change");
        match client.send_command(IpcCommand::Change)? {
            IpcResponse::Error { message } => log::error!("Running daemon reported: {}", message),
            response => log::debug!("Running daemon replied: {:?}", response),
        }
        return Ok(());
    }

    log::info!("Starting wallfit daemon...");

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}", e.user_friendly_message());
            Config::load_or_default()
        }
    };
    log::info!(
        "Watching {:?} (recursive: {}), policy: {:?}",
        config.image_directory(),
        config.general.recursive,
        config.policy()
    );

    let swww = locate_swww().map_err(|e| {
        log::error!("{}", e.user_friendly_message());
        anyhow::anyhow!(e.user_friendly_message())
    })?;
    let executor = ProcessExecutor::new(CommandBuilder::new(swww));
    if let Err(e) = executor.check_swww_daemon().await {
        log::warn!("{} Waiting for outputs to appear.", e.user_friendly_message());
    }

    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();

    let server = IpcServer::new();
    let listener = server.bind()?;
    let socket_path = server.socket_path().to_path_buf();
    let ipc_triggers = trigger_tx.clone();
    std::thread::spawn(move || {
        IpcServer::serve(listener, move |command| {
            let (reply_tx, reply_rx) = oneshot::channel();
            ipc_triggers
                .send(Trigger::Ipc { command, reply: reply_tx })
                .map_err(|_| anyhow::anyhow!("wallfit daemon is shutting down"))?;
            reply_rx.blocking_recv().context("wallfit daemon dropped the request")
        });
    });

    tokio::spawn(daemon::watch_displays(executor.clone(), trigger_tx.clone()));

    trigger_tx
        .send(Trigger::Startup)
        .map_err(|_| anyhow::anyhow!("dispatcher is not running"))?;

    let dispatcher = Daemon::new(config, executor, trigger_tx);
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::select! {
        _ = dispatcher.run(trigger_rx) => {}
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted, shutting down"),
        _ = terminate.recv() => log::info!("Terminated, shutting down"),
    }

    if let Err(e) = std::fs::remove_file(&socket_path) {
        log::debug!("Could not remove socket {:?}: {}", socket_path, e);
    }
    Ok(())
}
