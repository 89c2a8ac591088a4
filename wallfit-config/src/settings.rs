//! Name-addressed access to individual settings, used by `wallfit-cli config`.

use std::fmt;
use std::str::FromStr;
use wallfit_common::{DisplayMode, MultiMonitorMode, WallfitError, error::ConfigError, Result};
use wallfit_common::duration::{format_duration, parse_duration};
use crate::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Text,
    Int,
    Bool,
}

impl SettingKind {
    pub fn name(self) -> &'static str {
        match self {
            SettingKind::Text => "text",
            SettingKind::Int => "int",
            SettingKind::Bool => "bool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Text(_) => SettingKind::Text,
            SettingValue::Int(_) => SettingKind::Int,
            SettingValue::Bool(_) => SettingKind::Bool,
        }
    }

    pub fn as_text(&self, key: SettingKey) -> Result<&str> {
        match self {
            SettingValue::Text(text) => Ok(text),
            other => Err(mismatch(key, SettingKind::Text, other.kind())),
        }
    }

    pub fn as_int(&self, key: SettingKey) -> Result<i64> {
        match self {
            SettingValue::Int(value) => Ok(*value),
            other => Err(mismatch(key, SettingKind::Int, other.kind())),
        }
    }

    pub fn as_bool(&self, key: SettingKey) -> Result<bool> {
        match self {
            SettingValue::Bool(value) => Ok(*value),
            other => Err(mismatch(key, SettingKind::Bool, other.kind())),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Text(text) => write!(f, "{}", text),
            SettingValue::Int(value) => write!(f, "{}", value),
            SettingValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

fn mismatch(key: SettingKey, expected: SettingKind, found: SettingKind) -> WallfitError {
    WallfitError::Config(ConfigError::TypeMismatch {
        key: key.name().to_string(),
        expected: expected.name(),
        found: found.name(),
    })
}

fn invalid(key: SettingKey, value: impl ToString) -> WallfitError {
    WallfitError::Config(ConfigError::InvalidValue {
        field: key.name().to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    ImageDirectory,
    Recursive,
    AllowUpscaling,
    AutoChange,
    AutoChangeInterval,
    MaxAspectMismatch,
    DisplayMode,
    MultiMonitor,
    DebugLog,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::ImageDirectory,
        SettingKey::Recursive,
        SettingKey::AllowUpscaling,
        SettingKey::AutoChange,
        SettingKey::AutoChangeInterval,
        SettingKey::MaxAspectMismatch,
        SettingKey::DisplayMode,
        SettingKey::MultiMonitor,
        SettingKey::DebugLog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::ImageDirectory => "image_directory",
            SettingKey::Recursive => "recursive",
            SettingKey::AllowUpscaling => "allow_upscaling",
            SettingKey::AutoChange => "auto_change",
            SettingKey::AutoChangeInterval => "auto_change_interval",
            SettingKey::MaxAspectMismatch => "max_aspect_mismatch",
            SettingKey::DisplayMode => "display_mode",
            SettingKey::MultiMonitor => "multi_monitor",
            SettingKey::DebugLog => "debug_log",
        }
    }

    pub fn kind(self) -> SettingKind {
        match self {
            SettingKey::ImageDirectory
            | SettingKey::AutoChangeInterval
            | SettingKey::DisplayMode
            | SettingKey::MultiMonitor => SettingKind::Text,
            SettingKey::MaxAspectMismatch => SettingKind::Int,
            SettingKey::Recursive
            | SettingKey::AllowUpscaling
            | SettingKey::AutoChange
            | SettingKey::DebugLog => SettingKind::Bool,
        }
    }

    /// Whether a running daemon has to rescan the catalog after this setting
    /// changes.
    pub fn affects_catalog(self) -> bool {
        matches!(self, SettingKey::ImageDirectory | SettingKey::Recursive)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = WallfitError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().replace('-', "_");
        SettingKey::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(&name))
            .ok_or_else(|| WallfitError::Config(ConfigError::UnknownSetting { name: s.to_string() }))
    }
}

impl Config {
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::ImageDirectory => SettingValue::Text(self.general.image_directory.clone()),
            SettingKey::Recursive => SettingValue::Bool(self.general.recursive),
            SettingKey::AllowUpscaling => SettingValue::Bool(self.selection.allow_upscaling),
            SettingKey::AutoChange => SettingValue::Bool(self.general.auto_change),
            SettingKey::AutoChangeInterval => {
                SettingValue::Text(format_duration(self.general.auto_change_interval))
            }
            SettingKey::MaxAspectMismatch => {
                SettingValue::Int(i64::from(self.selection.max_aspect_mismatch))
            }
            SettingKey::DisplayMode => SettingValue::Text(self.selection.display_mode.to_string()),
            SettingKey::MultiMonitor => SettingValue::Text(self.selection.multi_monitor.to_string()),
            SettingKey::DebugLog => SettingValue::Bool(self.general.debug_log),
        }
    }

    /// Every setting with its current value, in a stable order.
    pub fn entries(&self) -> Vec<(SettingKey, SettingValue)> {
        SettingKey::ALL.into_iter().map(|key| (key, self.get(key))).collect()
    }

    /// Sets one value. The value's kind must match the key's, and the
    /// resulting configuration must validate; otherwise nothing changes.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<()> {
        let mut updated = self.clone();

        match key {
            SettingKey::ImageDirectory => {
                let text = value.as_text(key)?;
                updated.general.image_directory = text.to_string();
                if !updated.image_directory().is_dir() {
                    return Err(invalid(key, text));
                }
            }
            SettingKey::Recursive => updated.general.recursive = value.as_bool(key)?,
            SettingKey::AllowUpscaling => updated.selection.allow_upscaling = value.as_bool(key)?,
            SettingKey::AutoChange => updated.general.auto_change = value.as_bool(key)?,
            SettingKey::AutoChangeInterval => {
                let text = value.as_text(key)?;
                updated.general.auto_change_interval =
                    parse_duration(text).map_err(|_| invalid(key, text))?;
            }
            SettingKey::MaxAspectMismatch => {
                let raw = value.as_int(key)?;
                updated.selection.max_aspect_mismatch =
                    u32::try_from(raw).map_err(|_| invalid(key, raw))?;
            }
            SettingKey::DisplayMode => {
                let text = value.as_text(key)?;
                updated.selection.display_mode =
                    text.parse::<DisplayMode>().map_err(|_| invalid(key, text))?;
            }
            SettingKey::MultiMonitor => {
                let text = value.as_text(key)?;
                updated.selection.multi_monitor =
                    text.parse::<MultiMonitorMode>().map_err(|_| invalid(key, text))?;
            }
            SettingKey::DebugLog => updated.general.debug_log = value.as_bool(key)?,
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Parses `raw` according to the key's kind, then [`Config::set`]s it.
    pub fn set_from_str(&mut self, key: SettingKey, raw: &str) -> Result<()> {
        let raw = raw.trim();
        let value = match key.kind() {
            SettingKind::Text => SettingValue::Text(raw.to_string()),
            SettingKind::Int => SettingValue::Int(raw.parse().map_err(|_| invalid(key, raw))?),
            SettingKind::Bool => SettingValue::Bool(parse_bool(raw).ok_or_else(|| invalid(key, raw))?),
        };
        self.set(key, value)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_every_key_parses_from_its_name() {
        for key in SettingKey::ALL {
            assert_eq!(key.name().parse::<SettingKey>().unwrap(), key);
        }
        assert_eq!("max-aspect-mismatch".parse::<SettingKey>().unwrap(), SettingKey::MaxAspectMismatch);
    }

    #[test]
    fn test_unknown_key() {
        match "wallpaper_color".parse::<SettingKey>().unwrap_err() {
            WallfitError::Config(ConfigError::UnknownSetting { name }) => assert_eq!(name, "wallpaper_color"),
            other => panic!("Expected UnknownSetting, got {:?}", other),
        }
    }

    #[test]
    fn test_get_reports_declared_kind() {
        let config = Config::default();
        for (key, value) in config.entries() {
            assert_eq!(value.kind(), key.kind(), "{}", key);
        }
        assert_eq!(config.get(SettingKey::AutoChangeInterval), SettingValue::Text("10m".to_string()));
        assert_eq!(config.get(SettingKey::MaxAspectMismatch), SettingValue::Int(1));
    }

    #[test]
    fn test_set_with_wrong_kind_is_type_mismatch() {
        let mut config = Config::default();

        match config.set(SettingKey::AllowUpscaling, SettingValue::Int(1)).unwrap_err() {
            WallfitError::Config(ConfigError::TypeMismatch { key, expected, found }) => {
                assert_eq!(key, "allow_upscaling");
                assert_eq!(expected, "bool");
                assert_eq!(found, "int");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_typed_values() {
        let mut config = Config::default();

        config.set(SettingKey::AllowUpscaling, SettingValue::Bool(true)).unwrap();
        config.set(SettingKey::MaxAspectMismatch, SettingValue::Int(40)).unwrap();
        config.set(SettingKey::MultiMonitor, SettingValue::Text("same".to_string())).unwrap();
        config.set(SettingKey::DisplayMode, SettingValue::Text("Stretch".to_string())).unwrap();

        assert!(config.selection.allow_upscaling);
        assert_eq!(config.selection.max_aspect_mismatch, 40);
        assert_eq!(config.selection.multi_monitor, MultiMonitorMode::Same);
        assert_eq!(config.selection.display_mode, DisplayMode::Stretch);
    }

    #[test]
    fn test_set_rejects_out_of_range_and_keeps_old_value() {
        let mut config = Config::default();

        assert!(config.set(SettingKey::MaxAspectMismatch, SettingValue::Int(1001)).is_err());
        assert!(config.set(SettingKey::MaxAspectMismatch, SettingValue::Int(-5)).is_err());
        assert!(config.set_from_str(SettingKey::AutoChangeInterval, "0s").is_err());
        assert!(config.set_from_str(SettingKey::DisplayMode, "tile").is_err());

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_from_str() {
        let mut config = Config::default();

        config.set_from_str(SettingKey::AutoChange, "yes").unwrap();
        config.set_from_str(SettingKey::AutoChangeInterval, "1h").unwrap();
        config.set_from_str(SettingKey::MaxAspectMismatch, " 12 ").unwrap();
        let walls = tempfile::tempdir().unwrap();
        let walls_dir = walls.path().to_str().unwrap();
        config.set_from_str(SettingKey::ImageDirectory, walls_dir).unwrap();

        assert_eq!(config.auto_change_interval(), Some(Duration::from_secs(3600)));
        assert_eq!(config.selection.max_aspect_mismatch, 12);
        assert_eq!(config.get(SettingKey::ImageDirectory).to_string(), walls_dir);

        assert!(config.set_from_str(SettingKey::Recursive, "maybe").is_err());
        assert!(config.set_from_str(SettingKey::MaxAspectMismatch, "lots").is_err());
    }

    #[test]
    fn test_image_directory_must_exist() {
        let mut config = Config::default();
        let walls = tempfile::tempdir().unwrap();
        let missing = walls.path().join("not-there");
        let file = walls.path().join("a.png");
        std::fs::write(&file, b"").unwrap();

        for rejected in [&missing, &file] {
            match config.set_from_str(SettingKey::ImageDirectory, rejected.to_str().unwrap()).unwrap_err() {
                WallfitError::Config(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "image_directory"),
                other => panic!("Expected InvalidValue, got {:?}", other),
            }
        }
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_catalog_affecting_keys() {
        let affecting: Vec<_> = SettingKey::ALL.into_iter().filter(|k| k.affects_catalog()).collect();
        assert_eq!(affecting, vec![SettingKey::ImageDirectory, SettingKey::Recursive]);
    }
}
