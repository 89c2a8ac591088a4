use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use crate::command_builder::{CommandBuilder, DisplayMode};
use crate::error::{WallfitError, ProcessError, SwwwError};
use crate::swww::{parse_query_output, DisplayOutput};
use crate::Result;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Runs swww: enumerates outputs and sets wallpapers.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    command_builder: CommandBuilder,
}

impl ProcessExecutor {
    pub fn new(command_builder: CommandBuilder) -> Self {
        Self { command_builder }
    }

    /// Lists the outputs known to the swww daemon with their geometry and
    /// currently displayed image.
    pub async fn query_outputs(&self) -> Result<Vec<DisplayOutput>> {
        let cmd = self.command_builder.build_query_command();
        let stdout = run(cmd, "swww query").await.map_err(|e| match e {
            WallfitError::Process(ProcessError::NonZeroExit { .. }) => {
                WallfitError::Swww(SwwwError::DaemonNotFound)
            }
            other => other,
        })?;

        let outputs = parse_query_output(&stdout);
        if outputs.is_empty() {
            log::warn!("No outputs parsed from swww query stdout: {}", stdout);
            return Err(WallfitError::Swww(SwwwError::NoOutputs));
        }

        log::debug!("swww outputs: {:?}", outputs);
        Ok(outputs)
    }

    pub async fn check_swww_daemon(&self) -> Result<()> {
        self.query_outputs().await.map(|_| ())
    }

    /// Sets `image_path` on one output, retrying a few times before giving up.
    pub async fn set_wallpaper(
        &self,
        output_name: &str,
        image_path: &Path,
        mode: DisplayMode,
    ) -> Result<()> {
        let mut attempt = 1;
        loop {
            let cmd = self.command_builder.build_img_command(image_path, output_name, mode);
            match run(cmd, "swww img").await {
                Ok(_) => {
                    log::info!("Set wallpaper for {}: {:?}", output_name, image_path);
                    return Ok(());
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    log::warn!("Attempt {} to set wallpaper for {} failed: {}", attempt, output_name, e);
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn run(mut cmd: Command, label: &str) -> Result<String> {
    log::debug!("Executing {}: {:?}", label, cmd);

    let output = cmd.output().await
        .map_err(|e| WallfitError::Process(ProcessError::Execution {
            command: label.to_string(),
            source: e,
        }))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("{} failed with exit code {}: {}",
            label, output.status.code().unwrap_or(-1), stderr);

        if !stdout.is_empty() {
            log::debug!("{} stdout: {}", label, stdout);
        }

        return Err(WallfitError::Process(ProcessError::NonZeroExit {
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.to_string(),
        }));
    }

    Ok(stdout)
}
