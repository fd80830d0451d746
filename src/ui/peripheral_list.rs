use crate::peripheral::Peripheral;

/// Label shown when a peripheral advertises no name.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

/// Peripherals in the order they were first seen, one row per id.
///
/// Re-sightings are ignored: a row keeps the name and RSSI of its first
/// sighting. The controller's snapshot holds the latest values.
#[derive(Debug, Default)]
pub struct PeripheralList {
    rows: Vec<Peripheral>,
}

impl PeripheralList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the peripheral unless its id is already listed. Returns
    /// whether a row was added.
    pub fn insert(&mut self, peripheral: Peripheral) -> bool {
        if self.rows.iter().any(|p| p.id == peripheral.id) {
            return false;
        }
        self.rows.push(peripheral);
        true
    }

    pub fn rows(&self) -> &[Peripheral] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `<name> - RSSI: <value>`
pub fn row_label(peripheral: &Peripheral) -> String {
    let name = if peripheral.name.is_empty() {
        UNKNOWN_DEVICE
    } else {
        peripheral.name.as_str()
    };
    format!("{} - RSSI: {}", name, peripheral.rssi)
}
