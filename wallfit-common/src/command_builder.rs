use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// How an image is fitted onto its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Fill,    // cover the output, keep aspect ratio, may crop
    Fit,     // keep aspect ratio and the whole image, may leave bands
    Stretch, // cover the output, ignore aspect ratio
    Center,  // no scaling
}

impl DisplayMode {
    /// Value of swww's `--resize` flag.
    pub fn resize_arg(self) -> &'static str {
        match self {
            DisplayMode::Fill => "crop",
            DisplayMode::Fit => "fit",
            DisplayMode::Stretch => "stretch",
            DisplayMode::Center => "no",
        }
    }
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode::Fill
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayMode::Fill => write!(f, "Fill"),
            DisplayMode::Fit => write!(f, "Fit"),
            DisplayMode::Stretch => write!(f, "Stretch"),
            DisplayMode::Center => write!(f, "Center"),
        }
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fill" => Ok(DisplayMode::Fill),
            "fit" => Ok(DisplayMode::Fit),
            "stretch" => Ok(DisplayMode::Stretch),
            "center" => Ok(DisplayMode::Center),
            other => Err(format!("unknown display mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    swww_path: PathBuf,
}

impl CommandBuilder {
    pub fn new(swww_path: PathBuf) -> Self {
        Self { swww_path }
    }

    pub fn build_img_command(
        &self,
        image_path: &Path,
        output_name: &str,
        mode: DisplayMode,
    ) -> Command {
        let mut cmd = self.base_command();
        cmd.arg("img")
            .args(["-o", output_name])
            .args(["--resize", mode.resize_arg()])
            .arg(image_path);
        cmd
    }

    pub fn build_query_command(&self) -> Command {
        let mut cmd = self.base_command();
        cmd.arg("query");
        cmd
    }

    // swww finds its daemon socket through the session environment, which a
    // daemon started outside the compositor may lack.
    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.swww_path);
        for (key, value) in session_env() {
            cmd.env(key, value);
        }
        cmd
    }
}

fn session_env() -> Vec<(&'static str, String)> {
    let mut env = vec![
        (
            "WAYLAND_DISPLAY",
            std::env::var("WAYLAND_DISPLAY").unwrap_or_else(|_| "wayland-0".to_string()),
        ),
        (
            "XDG_RUNTIME_DIR",
            std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| {
                format!("/run/user/{}", rustix::process::getuid().as_raw())
            }),
        ),
        (
            "XDG_SESSION_TYPE",
            std::env::var("XDG_SESSION_TYPE").unwrap_or_else(|_| "wayland".to_string()),
        ),
    ];
    if let Ok(desktop) = std::env::var("XDG_CURRENT_DESKTOP") {
        env.push(("XDG_CURRENT_DESKTOP", desktop));
    }

    env
}
