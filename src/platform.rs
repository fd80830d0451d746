//! # Platform Boundary
//!
//! The host BLE stack as seen by the scan controller. Command-style calls
//! (permissions, radio state, start/stop) are synchronous methods on
//! `ScanPlatform`; asynchronous callbacks arrive as `PlatformEvent`s on a
//! channel drained by the scan service thread.

use crate::error::PlatformError;
use crate::peripheral::RawScanResult;
use crate::permissions::{Permission, PermissionOutcome};
use serde::{Deserialize, Serialize};

pub const SCAN_FAILED_ALREADY_STARTED: i32 = 1;
pub const SCAN_FAILED_APPLICATION_REGISTRATION_FAILED: i32 = 2;
pub const SCAN_FAILED_INTERNAL_ERROR: i32 = 3;
pub const SCAN_FAILED_FEATURE_UNSUPPORTED: i32 = 4;

/// Human-readable message for a scan failure code.
pub fn scan_failure_message(error_code: i32) -> &'static str {
    match error_code {
        SCAN_FAILED_ALREADY_STARTED => "Scan already started.",
        SCAN_FAILED_APPLICATION_REGISTRATION_FAILED => "Application registration failed.",
        SCAN_FAILED_INTERNAL_ERROR => "Internal error occurred.",
        SCAN_FAILED_FEATURE_UNSUPPORTED => "Feature unsupported.",
        _ => "Unknown scan failure.",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    LowLatency,
    Balanced,
    LowPower,
}

/// Scan profile handed to the platform when a scan starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSettings {
    pub mode: ScanMode,
    /// 0 delivers every result immediately; otherwise results are batched.
    pub report_delay_ms: u64,
}

/// Callbacks from the BLE stack.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    ScanResult(RawScanResult),
    BatchScanResults(Vec<RawScanResult>),
    ScanFailed(i32),
}

pub trait ScanPlatform {
    /// Platform API level, used to pick the permission set.
    fn api_level(&self) -> u32;

    fn has_permission(&self, permission: Permission) -> bool;

    /// Shows the permission dialog and blocks until the user answers.
    fn request_permissions(
        &mut self,
        permissions: &[Permission],
    ) -> Result<PermissionOutcome, PlatformError>;

    fn location_services_enabled(&self) -> bool;

    /// Opens the system location settings. Does not wait for the user.
    fn prompt_enable_location(&mut self);

    fn bluetooth_enabled(&self) -> bool;

    /// Opens the enable-Bluetooth prompt. Does not wait for the user.
    fn prompt_enable_bluetooth(&mut self);

    /// Whether a scanner handle exists.
    fn scanner_available(&self) -> bool;

    fn start_scan(&mut self, settings: &ScanSettings) -> Result<(), PlatformError>;

    fn stop_scan(&mut self) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_failure_messages() {
        assert_eq!(scan_failure_message(1), "Scan already started.");
        assert_eq!(scan_failure_message(2), "Application registration failed.");
        assert_eq!(scan_failure_message(3), "Internal error occurred.");
        assert_eq!(scan_failure_message(4), "Feature unsupported.");
        assert_eq!(scan_failure_message(42), "Unknown scan failure.");
        assert_eq!(scan_failure_message(-1), "Unknown scan failure.");
    }

    #[test]
    fn test_default_settings_are_low_latency_immediate() {
        let settings = ScanSettings::default();
        assert_eq!(settings.mode, ScanMode::LowLatency);
        assert_eq!(settings.report_delay_ms, 0);
    }
}
