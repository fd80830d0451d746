//! # Configuration Management Module
//!
//! Persistent application settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `scan_mode`: scan profile handed to the BLE stack (`low_latency` by default,
//!   ignored by the desktop backend)
//! - `report_delay_ms`: 0 for immediate results, otherwise results are batched
//! - `api_level`: permission profile the desktop backend reports
//! - `show_scan_notices`: acknowledge scan start/stop with a dialog
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/blescan/config.toml
//! - Linux: ~/.config/blescan/config.toml
//! - Windows: %APPDATA%\blescan\config.toml

use crate::error::ConfigError;
use crate::platform::{ScanMode, ScanSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Only the mobile scan stack honors this; btleplug has no scan profiles.
    pub scan_mode: ScanMode,
    pub report_delay_ms: u64,
    pub api_level: u32,
    pub show_scan_notices: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_mode: ScanMode::LowLatency,
            report_delay_ms: 0,
            api_level: 31,
            show_scan_notices: true,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blescan")
            .join("config.toml")
    }

    /// Load config from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(ConfigError::ParseFailed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string).map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            mode: self.scan_mode,
            report_delay_ms: self.report_delay_ms,
        }
    }
}
