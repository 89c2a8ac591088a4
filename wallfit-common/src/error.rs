use std::path::PathBuf;
use thiserror::Error;

/// Everything the library can fail with.
#[derive(Error, Debug)]
pub enum WallfitError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("swww: {0}")]
    Swww(#[from] SwwwError),

    #[error("process: {0}")]
    Process(#[from] ProcessError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("cannot write {path:?}")]
    FileWrite { path: PathBuf, source: std::io::Error },

    #[error("bad TOML: {message}")]
    TomlParse { message: String },

    #[error("{field} cannot be {value}")]
    InvalidValue { field: String, value: String },

    #[error("no setting named {name}")]
    UnknownSetting { name: String },

    #[error("{key} takes a {expected} value, got a {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("no user config directory on this system")]
    NoConfigDir,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot list {path:?}")]
    DirectoryRead { path: PathBuf, source: std::io::Error },

    #[error("{path:?} is not a supported image")]
    UnsupportedFormat { path: PathBuf },

    #[error("cannot read the size of {path:?}: {message}")]
    Dimensions { path: PathBuf, message: String },

    #[error("{path:?} is zero pixels wide or tall")]
    EmptyImage { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum SwwwError {
    #[error("swww not found in PATH")]
    BinaryNotFound,

    #[error("swww-daemon is not answering")]
    DaemonNotFound,

    #[error("swww lists no outputs")]
    NoOutputs,

    #[error("unexpected `swww query` line: {line}")]
    InvalidOutput { line: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("could not spawn {command:?}")]
    Execution { command: String, source: std::io::Error },

    #[error("exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
}

pub type Result<T> = std::result::Result<T, WallfitError>;

impl From<toml::de::Error> for WallfitError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse { message: err.to_string() }.into()
    }
}

impl From<toml::ser::Error> for WallfitError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::TomlParse { message: err.to_string() }.into()
    }
}

/// Turns errors into something worth showing on a terminal or in the log.
pub trait ErrorReporting {
    fn log_error(&self, context: &str);
    fn user_friendly_message(&self) -> String;
}

impl ErrorReporting for WallfitError {
    fn log_error(&self, context: &str) {
        log::error!("{}: {}", context, self.user_friendly_message());
        log::debug!("{}: {:?}", context, self);
    }

    fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(ConfigError::FileRead { path, source }) => {
                format!("Cannot read config file {:?} ({})", path, source)
            }
            Self::Config(ConfigError::TomlParse { message }) => {
                format!("Config file is not valid: {}", message)
            }
            Self::Config(ConfigError::TypeMismatch { key, expected, found }) => {
                format!("Setting '{}' expects a {} value, not a {}", key, expected, found)
            }
            Self::Config(ConfigError::UnknownSetting { name }) => {
                format!("Unknown setting '{}'. Run `wallfit-cli config list` to see them all.", name)
            }
            Self::Catalog(CatalogError::DirectoryRead { path, .. }) => {
                format!("Image directory is not accessible: {:?}", path)
            }
            Self::Swww(SwwwError::BinaryNotFound) => "swww is not installed or not in PATH.".to_string(),
            Self::Swww(SwwwError::DaemonNotFound) => {
                "swww-daemon is not running. Start it before wallfit.".to_string()
            }
            Self::Swww(SwwwError::NoOutputs) => "swww reports no outputs. Is a compositor running?".to_string(),
            other => {
                let mut message = other.to_string();
                if let Some(first) = message.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                message
            }
        }
    }
}
