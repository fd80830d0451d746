//! # Error Types Module
//!
//! Centralized error handling for the blescan application.
//!
//! ## Error Types
//! - `ScanError`: errors returned to callers of the scan commands, each with
//!   a stable code (`PERMISSION_DENIED`, `BLE_ERROR`, ...)
//! - `PlatformError`: failures reported by the host BLE stack
//! - `ConfigError`: configuration file I/O and parsing errors
//!
//! ## Usage Examples
//! ```rust
//! // Commands resolve to a ScanError on rejection
//! pub async fn start_scan(&self) -> Result<StartOutcome, ScanError> { ... }
//!
//! // Config module uses ConfigError
//! pub fn load() -> Result<Config, ConfigError> { ... }
//! ```

use std::fmt;

/// Errors surfaced to the caller of a scan command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// One or more runtime permissions were denied
    PermissionDenied(String),
    /// Location services are switched off
    LocationDisabled(String),
    /// The Bluetooth radio is powered off
    BluetoothDisabled(String),
    /// No adapter or scanner handle is available
    Unavailable(String),
    /// The OS refused the operation at call time
    Security(String),
    /// Anything else
    Unknown(String),
}

impl ScanError {
    /// Stable error code, suitable for matching across the command boundary.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::PermissionDenied(_) => "PERMISSION_DENIED",
            ScanError::LocationDisabled(_) => "GPS_NOT_ENABLED",
            ScanError::BluetoothDisabled(_) => "BLUETOOTH_DISABLED",
            ScanError::Unavailable(_) => "BLE_ERROR",
            ScanError::Security(_) => "BLE_SECURITY_EXCEPTION",
            ScanError::Unknown(_) => "BLE_UNKNOWN_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScanError::PermissionDenied(msg)
            | ScanError::LocationDisabled(msg)
            | ScanError::BluetoothDisabled(msg)
            | ScanError::Unavailable(msg)
            | ScanError::Security(msg)
            | ScanError::Unknown(msg) => msg,
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ScanError {}

/// Errors reported by the host BLE stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Adapter, scanner or UI surface is missing
    Unavailable(String),
    /// Permission revoked between check and call
    Security(String),
    Other(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Unavailable(msg) => write!(f, "Platform unavailable: {}", msg),
            PlatformError::Security(msg) => write!(f, "Permission denied: {}", msg),
            PlatformError::Other(msg) => write!(f, "An error occurred: {}", msg),
        }
    }
}

impl std::error::Error for PlatformError {}

impl From<PlatformError> for ScanError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Unavailable(msg) => ScanError::Unavailable(msg),
            PlatformError::Security(msg) => ScanError::Security(format!("Permission denied: {}", msg)),
            PlatformError::Other(msg) => ScanError::Unknown(format!("An error occurred: {}", msg)),
        }
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}
