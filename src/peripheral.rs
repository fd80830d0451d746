//! # Peripheral Records
//!
//! Normalizes raw scan results into the `Peripheral` record that is stored by
//! the controller and handed to subscribers.
//!
//! Wire shape: `{id, name, rssi, advertisementData}` where the advertisement
//! bytes are lowercase two-digit hex joined with commas (`"02,01,06"`).

use serde::{Deserialize, Serialize};

pub const UNKNOWN_NAME: &str = "Unknown";

/// A single sighting as delivered by the BLE stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawScanResult {
    pub address: Option<String>,
    pub name: Option<String>,
    pub rssi: i16,
    pub scan_record: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peripheral {
    pub id: String,
    pub name: String,
    pub rssi: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub advertisement_data: Option<String>,
}

impl Peripheral {
    /// Builds a record from a raw result. Returns `None` when the result has
    /// no usable device address.
    pub fn from_scan_result(result: &RawScanResult) -> Option<Self> {
        let id = result.address.as_deref().map(str::trim).filter(|a| !a.is_empty())?;

        let name = result
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_NAME)
            .to_string();

        Some(Self {
            id: id.to_string(),
            name,
            rssi: i32::from(result.rssi),
            advertisement_data: result.scan_record.as_deref().map(encode_hex),
        })
    }
}

/// Lowercase hex, one pair per byte, comma separated.
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(address: Option<&str>, name: Option<&str>) -> RawScanResult {
        RawScanResult {
            address: address.map(String::from),
            name: name.map(String::from),
            rssi: -67,
            scan_record: Some(vec![0x02, 0x01, 0x06, 0xFF]),
        }
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(&[0x02, 0x01, 0x06, 0xAB]), "02,01,06,ab");
        assert_eq!(encode_hex(&[]), "");
    }

    #[test]
    fn test_normalizes_result() {
        let peripheral = Peripheral::from_scan_result(&raw(Some("AA:BB:CC:DD:EE:FF"), Some("Tag")))
            .expect("has address");
        assert_eq!(peripheral.id, "AA:BB:CC:DD:EE:FF");
        assert_eq!(peripheral.name, "Tag");
        assert_eq!(peripheral.rssi, -67);
        assert_eq!(peripheral.advertisement_data.as_deref(), Some("02,01,06,ff"));
    }

    #[test]
    fn test_missing_name_is_unknown() {
        let p = Peripheral::from_scan_result(&raw(Some("AA:BB"), None)).unwrap();
        assert_eq!(p.name, UNKNOWN_NAME);

        let p = Peripheral::from_scan_result(&raw(Some("AA:BB"), Some(""))).unwrap();
        assert_eq!(p.name, UNKNOWN_NAME);
    }

    #[test]
    fn test_missing_address_is_discarded() {
        assert!(Peripheral::from_scan_result(&raw(None, Some("Tag"))).is_none());
        assert!(Peripheral::from_scan_result(&raw(Some(""), Some("Tag"))).is_none());
        assert!(Peripheral::from_scan_result(&raw(Some("   "), Some("Tag"))).is_none());
    }

    #[test]
    fn test_wire_shape() {
        let p = Peripheral::from_scan_result(&raw(Some("AA:BB"), Some("Tag"))).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["id"], "AA:BB");
        assert_eq!(json["rssi"], -67);
        assert_eq!(json["advertisementData"], "02,01,06,ff");

        let mut without_record = raw(Some("AA:BB"), None);
        without_record.scan_record = None;
        let p = Peripheral::from_scan_result(&without_record).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("advertisementData").is_none());
    }
}
