//! Settings for automatic away detection.
//!
//! Read from `<config_dir>/mplex-away/settings.json`; a missing file or
//! missing fields fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default note shown while auto-away is in effect
pub const DEFAULT_AWAY_NOTE: &str = "Detached from screen";
/// Default polling interval, in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoAwayConfig {
    /// Set away automatically when the multiplexer session is detached
    pub enabled: bool,
    /// Note to display while away
    pub away_note: String,
    /// Seconds between attachment samples
    pub interval_secs: u64,
}

impl Default for AutoAwayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            away_note: DEFAULT_AWAY_NOTE.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl AutoAwayConfig {
    pub fn poll_interval(&self) -> Duration {
        match self.interval_secs {
            0 => Duration::from_secs(DEFAULT_INTERVAL_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Load from the default location, using defaults if there is no file
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Returns the settings file path
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mplex-away").join("settings.json"))
}

/// Returns the log file path
pub fn log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("mplex-away").join("mplex-away.log"))
}
