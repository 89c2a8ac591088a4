use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputState {
    pub last_image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub last_updated: DateTime<Utc>,
}

/// What the daemon last put on each output. Persisted so a restart can tell
/// which wallpaper is its own even when swww reports no image.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssignmentState {
    pub outputs: HashMap<String, OutputState>,
    pub last_forced_change: Option<DateTime<Utc>>,
    pub last_save: DateTime<Utc>,
}

impl Default for AssignmentState {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentState {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            last_forced_change: None,
            last_save: Utc::now(),
        }
    }

    /// Writes the state next to `state_file` and renames it into place, so a
    /// crash mid-write leaves the previous file intact.
    pub fn save(&self, state_file: &Path) -> Result<()> {
        if let Some(dir) = state_file.parent() {
            fs::create_dir_all(dir).with_context(|| format!("Cannot create {:?}", dir))?;
        }

        let staging = state_file.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(self).context("Cannot encode assignment state")?;
        fs::write(&staging, json).with_context(|| format!("Cannot write {:?}", staging))?;
        fs::rename(&staging, state_file)
            .with_context(|| format!("Cannot move {:?} into place", staging))?;

        log::debug!("Saved {} output assignment(s) to {:?}", self.outputs.len(), state_file);
        Ok(())
    }

    pub fn load(state_file: &Path) -> Result<Self> {
        let json = match fs::read(state_file) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No previous assignments at {:?}", state_file);
                return Ok(Self::new());
            }
            Err(e) => return Err(e).with_context(|| format!("Cannot read {:?}", state_file)),
        };

        let state: Self = serde_json::from_slice(&json)
            .with_context(|| format!("{:?} is not a wallfit state file", state_file))?;
        log::info!("Restored {} output assignment(s) from {:?}", state.outputs.len(), state_file);
        Ok(state)
    }

    /// `$XDG_STATE_HOME/wallfit/state.json`
    pub fn default_path() -> PathBuf {
        let base = dirs::state_dir().unwrap_or_else(std::env::temp_dir);
        base.join("wallfit").join("state.json")
    }

    pub fn record(&mut self, output_name: &str, image: &Path, width: u32, height: u32) {
        let last_updated = Utc::now();
        let entry = OutputState { last_image: image.to_path_buf(), width, height, last_updated };
        self.outputs.insert(output_name.to_owned(), entry);
        self.last_save = last_updated;
    }

    pub fn mark_forced_change(&mut self) {
        self.last_forced_change = Some(Utc::now());
    }

    /// The image last set on `output_name`, provided the output still has the
    /// geometry it had then.
    pub fn current_image_for(&self, output_name: &str, width: u32, height: u32) -> Option<&Path> {
        self.outputs
            .get(output_name)
            .filter(|s| s.width == width && s.height == height)
            .map(|s| s.last_image.as_path())
    }

    /// Drops outputs that are no longer connected.
    pub fn retain_outputs<'a, I>(&mut self, connected: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let connected: HashSet<&str> = connected.into_iter().collect();
        let before = self.outputs.len();
        self.outputs.retain(|name, _| connected.contains(name.as_str()));
        if self.outputs.len() < before {
            log::debug!("Forgot {} disconnected output(s)", before - self.outputs.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_assignments_survive_restart() {
        let temp_dir = tempdir().unwrap();
        let state_file = temp_dir.path().join("nested").join("state.json");

        let mut state = AssignmentState::new();
        state.record("DP-1", Path::new("/walls/a.jpg"), 1920, 1080);
        state.mark_forced_change();
        state.save(&state_file).unwrap();

        let loaded = AssignmentState::load(&state_file).unwrap();
        assert_eq!(
            loaded.current_image_for("DP-1", 1920, 1080),
            Some(Path::new("/walls/a.jpg"))
        );
        assert!(loaded.last_forced_change.is_some());
        assert!(!state_file.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_missing_state_file_starts_fresh() {
        let temp_dir = tempdir().unwrap();
        let state = AssignmentState::load(&temp_dir.path().join("absent.json")).unwrap();
        assert!(state.outputs.is_empty());
        assert!(state.last_forced_change.is_none());
    }

    #[test]
    fn test_corrupt_state_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let state_file = temp_dir.path().join("state.json");
        fs::write(&state_file, "{ not json").unwrap();

        assert!(AssignmentState::load(&state_file).is_err());
    }

    #[test]
    fn test_geometry_change_forgets_image() {
        let mut state = AssignmentState::new();
        state.record("DP-1", Path::new("/walls/a.jpg"), 1920, 1080);

        assert!(state.current_image_for("DP-1", 2560, 1440).is_none());
        assert!(state.current_image_for("DP-2", 1920, 1080).is_none());
    }

    #[test]
    fn test_retain_connected_outputs() {
        let mut state = AssignmentState::new();
        state.record("DP-1", Path::new("/walls/a.jpg"), 1920, 1080);
        state.record("HDMI-A-1", Path::new("/walls/b.jpg"), 1920, 1080);

        state.retain_outputs(["DP-1"]);

        assert!(state.outputs.contains_key("DP-1"));
        assert!(!state.outputs.contains_key("HDMI-A-1"));
    }
}
