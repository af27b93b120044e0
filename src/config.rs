//! Coordinator settings and where they live on disk

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "controlbind";
const SETTINGS_FILE: &str = "settings.toml";
const BINDINGS_FILE: &str = "bindings.toml";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("{name} must lie in [0.0, 1.0), got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("capture threshold {capture} is below dispatch threshold {dispatch}")]
    CaptureBelowDispatch { capture: f32, dispatch: f32 },

    #[error("frame interval must be at least 1ms")]
    ZeroFrameInterval,
}

/// Tunables of the coordinator and its frame driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Axis magnitude above which a bound axis callback fires, every tick
    pub dispatch_axis_threshold: f32,

    /// Axis magnitude above which an axis capture completes.
    /// Higher than the dispatch threshold so stick drift cannot complete a capture.
    pub capture_axis_threshold: f32,

    /// Poll tick period
    pub frame_interval_ms: u64,

    /// Binding document location; defaults to the user config directory
    pub bindings_file: Option<PathBuf>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            dispatch_axis_threshold: 0.1,
            capture_axis_threshold: 0.5,
            frame_interval_ms: 16, // ~60 ticks per second
            bindings_file: None,
        }
    }
}

impl CoordinatorSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("dispatch_axis_threshold", self.dispatch_axis_threshold),
            ("capture_axis_threshold", self.capture_axis_threshold),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(SettingsError::ThresholdOutOfRange { name, value });
            }
        }
        if self.capture_axis_threshold < self.dispatch_axis_threshold {
            return Err(SettingsError::CaptureBelowDispatch {
                capture: self.capture_axis_threshold,
                dispatch: self.dispatch_axis_threshold,
            });
        }
        if self.frame_interval_ms == 0 {
            return Err(SettingsError::ZeroFrameInterval);
        }
        Ok(())
    }

    /// Loads settings from `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check settings file {}: {}", path.display(), e))?
        {
            info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read settings file {}: {}", path.display(), e))?;
        let settings: Self = toml::from_str(&raw)
            .map_err(|e| eyre!("Failed to parse settings file {}: {}", path.display(), e))?;
        settings
            .validate()
            .map_err(|e| eyre!("Invalid settings in {}: {}", path.display(), e))?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Configured bindings file, or `bindings.toml` in the config directory
    pub fn bindings_path(&self) -> Option<PathBuf> {
        self.bindings_file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join(BINDINGS_FILE)))
    }
}

/// `<user config dir>/controlbind`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR))
}

pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILE))
}
