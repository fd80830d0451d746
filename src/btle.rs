//! # Desktop BLE Backend
//!
//! `ScanPlatform` on top of btleplug. Desktop stacks have no runtime
//! permission dialog and no location-services switch, so those checks
//! always pass; the permission profile reported to the controller comes
//! from configuration.

use crate::advertisement::AdvertisementFields;
use crate::error::PlatformError;
use crate::peripheral::RawScanResult;
use crate::permissions::{Permission, PermissionOutcome};
use crate::platform::{PlatformEvent, ScanPlatform, ScanSettings, SCAN_FAILED_INTERNAL_ERROR};
use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use crossbeam_channel::Sender;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type EventStream = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

pub struct BtlePlatform {
    runtime: Handle,
    central: Option<Adapter>,
    callbacks: Sender<PlatformEvent>,
    api_level: u32,
    scan_task: Option<JoinHandle<()>>,
}

impl BtlePlatform {
    /// Opens the first Bluetooth adapter. Without one the platform still
    /// works but reports no scanner.
    ///
    /// Must not be called from inside the runtime behind `runtime`.
    pub fn connect(runtime: Handle, callbacks: Sender<PlatformEvent>, api_level: u32) -> Self {
        let central = match runtime.block_on(first_adapter()) {
            Ok(adapter) => {
                match runtime.block_on(adapter.adapter_info()) {
                    Ok(info) => log::info!("Using Bluetooth adapter: {}", info),
                    Err(e) => log::debug!("Could not read adapter info: {}", e),
                }
                Some(adapter)
            }
            Err(e) => {
                log::error!("Bluetooth is not available on this device: {}", e);
                None
            }
        };

        Self {
            runtime,
            central,
            callbacks,
            api_level,
            scan_task: None,
        }
    }

    fn central(&self) -> Result<&Adapter, PlatformError> {
        self.central
            .as_ref()
            .ok_or_else(|| PlatformError::Unavailable("No Bluetooth adapter found".to_string()))
    }

    fn abort_scan_task(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
    }
}

impl ScanPlatform for BtlePlatform {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn has_permission(&self, _permission: Permission) -> bool {
        true
    }

    fn request_permissions(
        &mut self,
        _permissions: &[Permission],
    ) -> Result<PermissionOutcome, PlatformError> {
        Ok(PermissionOutcome::Granted)
    }

    fn location_services_enabled(&self) -> bool {
        true
    }

    fn prompt_enable_location(&mut self) {}

    // btleplug does not expose the radio power state; a powered-off radio
    // surfaces as a start_scan error instead.
    fn bluetooth_enabled(&self) -> bool {
        true
    }

    fn prompt_enable_bluetooth(&mut self) {
        log::warn!("Please switch Bluetooth on in the system settings");
    }

    fn scanner_available(&self) -> bool {
        self.central.is_some()
    }

    fn start_scan(&mut self, settings: &ScanSettings) -> Result<(), PlatformError> {
        self.abort_scan_task();
        let central = self.central()?.clone();

        // Subscribe before starting so the first advertisements are not lost
        let events = self.runtime.block_on(central.events()).map_err(platform_error)?;
        self.runtime
            .block_on(central.start_scan(ScanFilter::default()))
            .map_err(platform_error)?;

        log::debug!("btleplug scan started with {:?}", settings);
        let report_delay = Duration::from_millis(settings.report_delay_ms);
        let callbacks = self.callbacks.clone();
        self.scan_task = Some(
            self.runtime
                .spawn(forward_scan_results(central, events, callbacks, report_delay)),
        );
        Ok(())
    }

    fn stop_scan(&mut self) -> Result<(), PlatformError> {
        // BlueZ rejects a stop when this client has no discovery running
        if self.scan_task.is_none() {
            log::debug!("No btleplug scan to stop");
            return Ok(());
        }
        self.abort_scan_task();
        let central = self.central()?;
        self.runtime.block_on(central.stop_scan()).map_err(platform_error)
    }
}

impl Drop for BtlePlatform {
    fn drop(&mut self) {
        self.abort_scan_task();
    }
}

async fn first_adapter() -> Result<Adapter, PlatformError> {
    let manager = Manager::new().await.map_err(platform_error)?;
    let adapters = manager.adapters().await.map_err(platform_error)?;
    adapters
        .into_iter()
        .next()
        .ok_or_else(|| PlatformError::Unavailable("No Bluetooth adapter found".to_string()))
}

fn platform_error(err: btleplug::Error) -> PlatformError {
    match err {
        btleplug::Error::PermissionDenied => PlatformError::Security(err.to_string()),
        other => PlatformError::Other(other.to_string()),
    }
}

/// Turns adapter events into scan callbacks until aborted. A non-zero
/// `report_delay` batches results and flushes them on that interval.
async fn forward_scan_results(
    central: Adapter,
    mut events: EventStream,
    callbacks: Sender<PlatformEvent>,
    report_delay: Duration,
) {
    let batching = !report_delay.is_zero();
    let mut flush = tokio::time::interval(if batching {
        report_delay
    } else {
        Duration::from_secs(3600)
    });
    flush.tick().await;
    let mut batch = Vec::new();

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(CentralEvent::DeviceDiscovered(id)) | Some(CentralEvent::DeviceUpdated(id)) => {
                    let Some(result) = scan_result(&central, &id).await else {
                        continue;
                    };
                    if batching {
                        batch.push(result);
                    } else if callbacks.send(PlatformEvent::ScanResult(result)).is_err() {
                        return;
                    }
                }
                Some(_) => {}
                None => {
                    log::warn!("Bluetooth event stream ended while scanning");
                    let _ = callbacks.send(PlatformEvent::ScanFailed(SCAN_FAILED_INTERNAL_ERROR));
                    return;
                }
            },
            _ = flush.tick(), if batching => {
                if !batch.is_empty()
                    && callbacks
                        .send(PlatformEvent::BatchScanResults(std::mem::take(&mut batch)))
                        .is_err()
                {
                    return;
                }
            }
        }
    }
}

async fn scan_result(central: &Adapter, id: &PeripheralId) -> Option<RawScanResult> {
    let peripheral = match central.peripheral(id).await {
        Ok(peripheral) => peripheral,
        Err(e) => {
            log::debug!("Error processing scan result for {:?}: {}", id, e);
            return None;
        }
    };
    let props = match peripheral.properties().await {
        Ok(Some(props)) => props,
        Ok(None) => return None,
        Err(e) => {
            log::debug!("Could not read properties of {:?}: {}", id, e);
            return None;
        }
    };
    raw_scan_result(&props, &format!("{:?}", id))
}

/// CoreBluetooth hides MAC addresses and reports all zeros, so the
/// platform peripheral id stands in for the address there.
fn raw_scan_result(props: &PeripheralProperties, fallback_id: &str) -> Option<RawScanResult> {
    // Cached entries without a fresh sighting carry no RSSI
    let rssi = props.rssi?;
    let address = if props.address == BDAddr::from([0u8; 6]) {
        fallback_id.to_string()
    } else {
        props.address.to_string()
    };

    let record = AdvertisementFields::from_properties(props).encode();

    Some(RawScanResult {
        address: Some(address),
        name: props.local_name.clone(),
        rssi,
        scan_record: (!record.is_empty()).then_some(record),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_scan_result_from_properties() {
        let props = PeripheralProperties {
            address: BDAddr::from([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]),
            local_name: Some("Tag".to_string()),
            rssi: Some(-61),
            ..Default::default()
        };

        let result = raw_scan_result(&props, "ignored").expect("has rssi");
        assert_eq!(
            result.address.map(|a| a.to_uppercase()).as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
        assert_eq!(result.name.as_deref(), Some("Tag"));
        assert_eq!(result.rssi, -61);
        assert_eq!(result.scan_record, Some(vec![0x04, 0x09, b'T', b'a', b'g']));
    }

    #[test]
    fn test_zero_address_uses_peripheral_id() {
        let props = PeripheralProperties {
            rssi: Some(-70),
            ..Default::default()
        };

        let result = raw_scan_result(&props, "PeripheralId(1234)").unwrap();
        assert_eq!(result.address.as_deref(), Some("PeripheralId(1234)"));
    }

    #[test]
    fn test_empty_advertisement_has_no_record() {
        let props = PeripheralProperties {
            address: BDAddr::from([1, 2, 3, 4, 5, 6]),
            rssi: Some(-80),
            ..Default::default()
        };

        let result = raw_scan_result(&props, "id").unwrap();
        assert_eq!(result.scan_record, None);

        let peripheral = crate::peripheral::Peripheral::from_scan_result(&result).unwrap();
        let json = serde_json::to_value(&peripheral).unwrap();
        assert!(json.get("advertisementData").is_none());
    }

    #[test]
    fn test_result_without_rssi_is_skipped() {
        let props = PeripheralProperties {
            address: BDAddr::from([1, 2, 3, 4, 5, 6]),
            ..Default::default()
        };
        assert!(raw_scan_result(&props, "id").is_none());
    }

    #[test]
    fn test_permission_denied_maps_to_security() {
        assert!(matches!(
            platform_error(btleplug::Error::PermissionDenied),
            PlatformError::Security(_)
        ));
        assert!(matches!(
            platform_error(btleplug::Error::NotSupported("le".into())),
            PlatformError::Other(_)
        ));
    }
}
