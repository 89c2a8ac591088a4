use serde::{Deserialize, Serialize};

/// Upper bound of `Policy::max_aspect_mismatch`, in parts per thousand.
pub const MAX_ASPECT_MISMATCH_PERMILLE: u32 = 1000;

/// How images are spread across several outputs within one assignment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiMonitorMode {
    Different, // Prefer a distinct image on every output
    Same,      // Prefer an image already chosen for another output
    Whatever,  // No preference
}

impl Default for MultiMonitorMode {
    fn default() -> Self {
        MultiMonitorMode::Different
    }
}

impl std::fmt::Display for MultiMonitorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultiMonitorMode::Different => write!(f, "Different"),
            MultiMonitorMode::Same => write!(f, "Same"),
            MultiMonitorMode::Whatever => write!(f, "Whatever"),
        }
    }
}

impl std::str::FromStr for MultiMonitorMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "different" => Ok(MultiMonitorMode::Different),
            "same" => Ok(MultiMonitorMode::Same),
            "whatever" => Ok(MultiMonitorMode::Whatever),
            other => Err(format!("unknown multi-monitor mode '{}'", other)),
        }
    }
}

/// Selection constraints shared by every slot of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub allow_upscaling: bool,
    /// Permitted relative aspect-ratio deviation, parts per thousand.
    pub max_aspect_mismatch: u32,
    pub multi_monitor: MultiMonitorMode,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_upscaling: false,
            max_aspect_mismatch: 1,
            multi_monitor: MultiMonitorMode::default(),
        }
    }
}
