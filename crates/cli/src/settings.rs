use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use redact_core::mosaic::domain::region::MosaicIntensity;
use redact_core::shared::constants::DEFAULT_DETECTION_TIMEOUT;

/// Persistent defaults for the CLI. Command-line flags override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub intensity: MosaicIntensity,
    pub detection_timeout_secs: u64,
    /// When set, detected boxes overlapping an existing region above this
    /// IoU are dropped.
    pub overlap_threshold: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            intensity: MosaicIntensity::default(),
            detection_timeout_secs: DEFAULT_DETECTION_TIMEOUT.as_secs(),
            overlap_threshold: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("redact").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("Ignoring malformed settings at {}: {e}", path.display());
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Rejects values that would make a run silently do nothing useful,
    /// wherever they came from.
    pub fn validate(&self) -> Result<(), String> {
        if self.detection_timeout_secs == 0 {
            return Err("Detection timeout must be at least 1 second".into());
        }
        if let Some(t) = self.overlap_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!(
                    "Overlap threshold must be between 0.0 and 1.0, got {t}"
                ));
            }
        }
        Ok(())
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                log::warn!("Failed to save settings to {}: {e}", path.display());
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
