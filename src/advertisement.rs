//! # Advertisement Payload
//!
//! btleplug hands out parsed advertisement fields rather than the raw scan
//! record. This rebuilds a standard AD-structure payload (length, type,
//! data) from those fields so every backend reports advertisement bytes in
//! the same form.

use btleplug::api::bleuuid::BleUuid;
use btleplug::api::PeripheralProperties;
use std::collections::HashMap;
use uuid::Uuid;

const AD_COMPLETE_16_BIT_UUIDS: u8 = 0x03;
const AD_COMPLETE_128_BIT_UUIDS: u8 = 0x07;
const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_TX_POWER_LEVEL: u8 = 0x0A;
const AD_SERVICE_DATA_16_BIT: u8 = 0x16;
const AD_SERVICE_DATA_128_BIT: u8 = 0x21;
const AD_MANUFACTURER_DATA: u8 = 0xFF;

/// Largest payload a single AD structure can carry (length byte covers type + data).
const MAX_AD_DATA: usize = 254;

/// Parsed advertisement fields, borrowed from whatever the backend produced.
#[derive(Debug, Default)]
pub struct AdvertisementFields<'a> {
    pub local_name: Option<&'a str>,
    pub tx_power_level: Option<i16>,
    pub services: &'a [Uuid],
    pub service_data: Option<&'a HashMap<Uuid, Vec<u8>>>,
    pub manufacturer_data: Option<&'a HashMap<u16, Vec<u8>>>,
}

impl<'a> AdvertisementFields<'a> {
    pub fn from_properties(props: &'a PeripheralProperties) -> Self {
        Self {
            local_name: props.local_name.as_deref(),
            tx_power_level: props.tx_power_level,
            services: &props.services,
            service_data: Some(&props.service_data),
            manufacturer_data: Some(&props.manufacturer_data),
        }
    }

    /// Encodes the fields as concatenated AD structures. Map-backed fields
    /// are emitted in key order so the output is stable.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        if let Some(name) = self.local_name.filter(|n| !n.is_empty()) {
            push_structure(&mut out, AD_COMPLETE_LOCAL_NAME, name.as_bytes());
        }

        if let Some(level) = self.tx_power_level {
            let level = level.clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8;
            push_structure(&mut out, AD_TX_POWER_LEVEL, &level.to_le_bytes());
        }

        let mut short_uuids = Vec::new();
        let mut long_uuids = Vec::new();
        for uuid in self.services {
            match uuid.to_ble_u16() {
                Some(short) => short_uuids.extend_from_slice(&short.to_le_bytes()),
                None => long_uuids.extend(le_uuid(uuid)),
            }
        }
        if !short_uuids.is_empty() {
            push_structure(&mut out, AD_COMPLETE_16_BIT_UUIDS, &short_uuids);
        }
        if !long_uuids.is_empty() {
            push_structure(&mut out, AD_COMPLETE_128_BIT_UUIDS, &long_uuids);
        }

        if let Some(service_data) = self.service_data {
            let mut entries: Vec<_> = service_data.iter().collect();
            entries.sort_by_key(|(uuid, _)| **uuid);
            for (uuid, data) in entries {
                let mut payload = Vec::with_capacity(16 + data.len());
                let ad_type = match uuid.to_ble_u16() {
                    Some(short) => {
                        payload.extend_from_slice(&short.to_le_bytes());
                        AD_SERVICE_DATA_16_BIT
                    }
                    None => {
                        payload.extend(le_uuid(uuid));
                        AD_SERVICE_DATA_128_BIT
                    }
                };
                payload.extend_from_slice(data);
                push_structure(&mut out, ad_type, &payload);
            }
        }

        if let Some(manufacturer_data) = self.manufacturer_data {
            let mut entries: Vec<_> = manufacturer_data.iter().collect();
            entries.sort_by_key(|(company, _)| **company);
            for (company, data) in entries {
                let mut payload = company.to_le_bytes().to_vec();
                payload.extend_from_slice(data);
                push_structure(&mut out, AD_MANUFACTURER_DATA, &payload);
            }
        }

        out
    }
}

/// UUIDs go over the air little-endian.
fn le_uuid(uuid: &Uuid) -> impl Iterator<Item = u8> + '_ {
    uuid.as_bytes().iter().rev().copied()
}

fn push_structure(out: &mut Vec<u8>, ad_type: u8, data: &[u8]) {
    let data = &data[..data.len().min(MAX_AD_DATA)];
    out.push(data.len() as u8 + 1);
    out.push(ad_type);
    out.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_encode_nothing() {
        assert!(AdvertisementFields::default().encode().is_empty());
    }

    #[test]
    fn test_local_name_and_tx_power() {
        let fields = AdvertisementFields {
            local_name: Some("Tag"),
            tx_power_level: Some(-8),
            ..Default::default()
        };
        assert_eq!(
            fields.encode(),
            vec![0x04, 0x09, b'T', b'a', b'g', 0x02, 0x0A, 0xF8]
        );
    }

    #[test]
    fn test_manufacturer_data_little_endian_company() {
        let mut manufacturer = HashMap::new();
        manufacturer.insert(0x004C_u16, vec![0x02, 0x15]);
        let fields = AdvertisementFields {
            manufacturer_data: Some(&manufacturer),
            ..Default::default()
        };
        assert_eq!(fields.encode(), vec![0x05, 0xFF, 0x4C, 0x00, 0x02, 0x15]);
    }

    #[test]
    fn test_short_and_long_service_uuids() {
        // Heart rate service in the Bluetooth base UUID range
        let heart_rate = Uuid::from_u128(0x0000180D_0000_1000_8000_00805F9B34FB);
        let custom = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
        let services = [heart_rate, custom];
        let fields = AdvertisementFields {
            services: &services,
            ..Default::default()
        };

        let encoded = fields.encode();
        assert_eq!(&encoded[..4], &[0x03, 0x03, 0x0D, 0x18]);
        assert_eq!(encoded[4], 17);
        assert_eq!(encoded[5], AD_COMPLETE_128_BIT_UUIDS);
        assert_eq!(encoded[6], 0x9E);
        assert_eq!(encoded[21], 0x6E);
    }

    #[test]
    fn test_service_data_16_bit() {
        let battery = Uuid::from_u128(0x0000180F_0000_1000_8000_00805F9B34FB);
        let mut service_data = HashMap::new();
        service_data.insert(battery, vec![0x64]);
        let fields = AdvertisementFields {
            service_data: Some(&service_data),
            ..Default::default()
        };
        assert_eq!(fields.encode(), vec![0x04, 0x16, 0x0F, 0x18, 0x64]);
    }

    #[test]
    fn test_oversized_field_truncated() {
        let name = "x".repeat(300);
        let fields = AdvertisementFields {
            local_name: Some(&name),
            ..Default::default()
        };
        let encoded = fields.encode();
        assert_eq!(encoded[0], 255);
        assert_eq!(encoded.len(), 256);
    }
}
