//! # Scan Controller
//!
//! Mediates between scan commands and the platform BLE stack: negotiates
//! permissions, checks radio and location state, starts and stops the scan,
//! and keeps the de-duplicated set of discovered peripherals.
//!
//! ## Threading
//! The controller is owned by the scan service thread. Commands and platform
//! callbacks are both handled there one at a time, so no locking is needed
//! around the discovered set or the session state.

use crate::error::ScanError;
use crate::events::{EventBus, ScanEvent};
use crate::peripheral::{Peripheral, RawScanResult};
use crate::permissions::{self, PermissionOutcome};
use crate::platform::{scan_failure_message, PlatformEvent, ScanPlatform, ScanSettings};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A scan was already running; nothing was cleared or emitted.
    AlreadyScanning,
}

pub struct ScanController<P: ScanPlatform> {
    platform: P,
    settings: ScanSettings,
    state: ScanState,
    /// Insertion order of the discovered set
    peripherals: Vec<Peripheral>,
    index: HashMap<String, usize>,
    events: EventBus,
}

impl<P: ScanPlatform> ScanController<P> {
    pub fn new(platform: P, settings: ScanSettings, events: EventBus) -> Self {
        Self {
            platform,
            settings,
            state: ScanState::Idle,
            peripherals: Vec::new(),
            index: HashMap::new(),
            events,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Snapshot of the discovered set, in first-sighting order.
    pub fn discovered_peripherals(&self) -> Vec<Peripheral> {
        self.peripherals.clone()
    }

    pub fn start_scan(&mut self) -> Result<StartOutcome, ScanError> {
        log::debug!("start_scan called");
        if self.state == ScanState::Scanning {
            log::info!("Scan already running, ignoring start request");
            return Ok(StartOutcome::AlreadyScanning);
        }

        self.ensure_permissions()?;

        if !self.platform.location_services_enabled() {
            log::info!("Location services are off, requesting to turn them on");
            self.platform.prompt_enable_location();
            return Err(ScanError::LocationDisabled(
                "GPS is not enabled. Please enable GPS.".to_string(),
            ));
        }

        if !self.platform.bluetooth_enabled() {
            log::info!("Bluetooth is off, prompting the user to enable it");
            self.platform.prompt_enable_bluetooth();
            return Err(ScanError::BluetoothDisabled(
                "Bluetooth is disabled. Enable Bluetooth and start the scan again.".to_string(),
            ));
        }

        if !self.platform.scanner_available() {
            return Err(ScanError::Unavailable(
                "Bluetooth is not available on this device.".to_string(),
            ));
        }

        self.platform.start_scan(&self.settings).map_err(|e| {
            log::error!("Platform refused to start scan: {}", e);
            ScanError::from(e)
        })?;

        self.peripherals.clear();
        self.index.clear();
        self.state = ScanState::Scanning;
        log::info!("Scanning started ({:?})", self.settings);
        self.events.emit(ScanEvent::ScanStarted);

        Ok(StartOutcome::Started)
    }

    pub fn stop_scan(&mut self) -> Result<(), ScanError> {
        if !self.platform.scanner_available() {
            return Err(ScanError::Unavailable(
                "Scanner is not available. Ensure Bluetooth is enabled.".to_string(),
            ));
        }

        // Nothing is running, so there is nothing for the stack to stop
        if self.state == ScanState::Idle {
            log::debug!("Stop requested while idle");
            self.events.emit(ScanEvent::ScanStopped);
            return Ok(());
        }

        self.platform.stop_scan().map_err(|e| {
            log::error!("Failed to stop scan: {}", e);
            ScanError::from(e)
        })?;

        self.state = ScanState::Idle;
        log::info!("Scanning stopped");
        self.events.emit(ScanEvent::ScanStopped);
        Ok(())
    }

    pub fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::ScanResult(result) => self.on_scan_result(&result),
            PlatformEvent::BatchScanResults(results) => {
                log::debug!("Batch of {} scan results", results.len());
                for result in &results {
                    self.on_scan_result(result);
                }
            }
            PlatformEvent::ScanFailed(error_code) => self.on_scan_failed(error_code),
        }
    }

    fn on_scan_result(&mut self, result: &RawScanResult) {
        if self.state != ScanState::Scanning {
            log::debug!("Dropping scan result delivered after stop: {:?}", result.address);
            return;
        }

        let api_level = self.platform.api_level();
        let required = permissions::scan_result_permissions(api_level);
        if !required.iter().all(|p| self.platform.has_permission(*p)) {
            log::warn!("Permissions not granted for Bluetooth access, dropping scan result");
            return;
        }

        let Some(peripheral) = Peripheral::from_scan_result(result) else {
            log::debug!("Discarding scan result without a device address");
            return;
        };

        log::debug!("Discovered peripheral: {:?}", peripheral);
        match self.index.get(&peripheral.id).copied() {
            Some(slot) => self.peripherals[slot] = peripheral.clone(),
            None => {
                self.index.insert(peripheral.id.clone(), self.peripherals.len());
                self.peripherals.push(peripheral.clone());
            }
        }
        self.events.emit(ScanEvent::PeripheralDiscovered(peripheral));
    }

    fn on_scan_failed(&mut self, error_code: i32) {
        let message = scan_failure_message(error_code).to_string();
        log::warn!("Scan failed with error {}: {}", error_code, message);
        self.events.emit(ScanEvent::ScanFailed { error_code, message });

        if self.state == ScanState::Scanning {
            self.state = ScanState::Idle;
            self.events.emit(ScanEvent::ScanStopped);
        }
    }

    /// Requests whatever start permissions are missing and waits for the answer.
    fn ensure_permissions(&mut self) -> Result<(), ScanError> {
        let required = permissions::scan_start_permissions(self.platform.api_level());
        let missing: Vec<_> = required
            .into_iter()
            .filter(|p| !self.platform.has_permission(*p))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        log::debug!(
            "Permissions not granted. Requesting {}",
            permissions::describe(&missing)
        );
        match self.platform.request_permissions(&missing)? {
            PermissionOutcome::Granted => {
                log::debug!("All permissions granted");
                Ok(())
            }
            PermissionOutcome::Denied(denied) => {
                let denied = permissions::describe(&denied);
                log::error!("Permissions denied: {}", denied);
                Err(ScanError::PermissionDenied(format!("Permissions denied: {}", denied)))
            }
        }
    }
}
