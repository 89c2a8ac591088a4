use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wallfit_common::{DisplayMode, MultiMonitorMode, Policy, WallfitError, error::ConfigError, Result};
use wallfit_common::policy::MAX_ASPECT_MISMATCH_PERMILLE;

pub mod settings;

pub use settings::{SettingKey, SettingKind, SettingValue};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default = "default_image_directory")]
    pub image_directory: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub auto_change: bool,
    #[serde(default = "default_auto_change_interval", with = "humantime_serde")]
    pub auto_change_interval: Duration,
    #[serde(default)]
    pub debug_log: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub allow_upscaling: bool,
    /// Parts per thousand of the output's aspect ratio.
    #[serde(default = "default_max_aspect_mismatch")]
    pub max_aspect_mismatch: u32,
    #[serde(default)]
    pub multi_monitor: MultiMonitorMode,
    #[serde(default)]
    pub display_mode: DisplayMode,
}

// Default values
fn default_image_directory() -> String {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .map(|dir| dir.to_string_lossy().to_string())
        .unwrap_or_else(|| "~/Pictures".to_string())
}

fn default_auto_change_interval() -> Duration {
    Duration::from_secs(600) // 10 minutes
}

fn default_max_aspect_mismatch() -> u32 {
    1
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            image_directory: default_image_directory(),
            recursive: false,
            auto_change: false,
            auto_change_interval: default_auto_change_interval(),
            debug_log: false,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            allow_upscaling: false,
            max_aspect_mismatch: default_max_aspect_mismatch(),
            multi_monitor: MultiMonitorMode::default(),
            display_mode: DisplayMode::default(),
        }
    }
}

impl Config {
    /// Loads the user's config file, failing on a missing file, bad TOML or
    /// out-of-range values.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Like [`Config::load`], but never fails: a missing file is created with
    /// the defaults and any other problem is logged and replaced by defaults.
    pub fn load_or_default() -> Self {
        let config_path = match Self::config_path() {
            Ok(path) => path,
            Err(e) => {
                log::warn!("{}; using default configuration", e);
                return Self::default();
            }
        };

        if !config_path.exists() {
            let config = Self::default();
            match config.save_to_path(&config_path) {
                Ok(()) => log::info!("Wrote default configuration to {:?}", config_path),
                Err(e) => log::warn!("Could not write default configuration: {}", e),
            }
            return config;
        }

        match Self::load_from_path(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid configuration ({}); using defaults", e);
                Self::default()
            }
        }
    }

    /// Loads the user's config file, starting from the defaults when none has
    /// been written yet. Bad TOML and out-of-range values still fail.
    pub fn load_or_missing() -> Result<Self> {
        Self::load_or_missing_from_path(&Self::config_path()?)
    }

    pub fn load_or_missing_from_path(path: &Path) -> Result<Self> {
        match Self::load_from_path(path) {
            Err(WallfitError::Config(ConfigError::FileRead { source, .. }))
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::debug!("No configuration at {:?} yet; starting from defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WallfitError::Config(ConfigError::FileRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
            }));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WallfitError::Config(ConfigError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| WallfitError::Config(ConfigError::TomlParse {
                message: e.to_string(),
            }))?;

        config.validate()?;
        log::debug!("Loaded configuration from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WallfitError::Config(ConfigError::FileWrite {
                    path: parent.to_path_buf(),
                    source: e,
                }))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| WallfitError::Config(ConfigError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            }))?;

        log::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| WallfitError::Config(ConfigError::NoConfigDir))?
            .join("wallfit");

        Ok(config_dir.join("config.toml"))
    }

    /// The image directory with a leading `~` expanded.
    pub fn image_directory(&self) -> PathBuf {
        expand_home(&self.general.image_directory)
    }

    pub fn policy(&self) -> Policy {
        Policy {
            allow_upscaling: self.selection.allow_upscaling,
            max_aspect_mismatch: self.selection.max_aspect_mismatch,
            multi_monitor: self.selection.multi_monitor,
        }
    }

    /// The auto-change interval when automatic changes are enabled.
    pub fn auto_change_interval(&self) -> Option<Duration> {
        self.general.auto_change.then_some(self.general.auto_change_interval)
    }

    pub fn validate(&self) -> Result<()> {
        if self.selection.max_aspect_mismatch > MAX_ASPECT_MISMATCH_PERMILLE {
            return Err(WallfitError::Config(ConfigError::InvalidValue {
                field: "max_aspect_mismatch".to_string(),
                value: self.selection.max_aspect_mismatch.to_string(),
            }));
        }

        if self.general.auto_change_interval < Duration::from_secs(1) {
            return Err(WallfitError::Config(ConfigError::InvalidValue {
                field: "auto_change_interval".to_string(),
                value: format!("{:?}", self.general.auto_change_interval),
            }));
        }

        if self.general.image_directory.trim().is_empty() {
            return Err(WallfitError::Config(ConfigError::InvalidValue {
                field: "image_directory".to_string(),
                value: self.general.image_directory.clone(),
            }));
        }

        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
