//! Runtime permissions required for BLE scanning.
//!
//! Platform API level 31 introduced a dedicated scan permission; older
//! levels gate scanning behind fine location access instead.

use std::fmt;

/// First API level with the dedicated `BLUETOOTH_SCAN` permission.
pub const API_LEVEL_SCAN_PERMISSION: u32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Bluetooth,
    BluetoothAdmin,
    BluetoothScan,
    AccessFineLocation,
}

impl Permission {
    pub fn name(&self) -> &'static str {
        match self {
            Permission::Bluetooth => "BLUETOOTH",
            Permission::BluetoothAdmin => "BLUETOOTH_ADMIN",
            Permission::BluetoothScan => "BLUETOOTH_SCAN",
            Permission::AccessFineLocation => "ACCESS_FINE_LOCATION",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Answer to a permission request dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied(Vec<Permission>),
}

/// Permissions checked before a scan is started.
pub fn scan_start_permissions(api_level: u32) -> Vec<Permission> {
    if api_level >= API_LEVEL_SCAN_PERMISSION {
        vec![
            Permission::Bluetooth,
            Permission::BluetoothAdmin,
            Permission::BluetoothScan,
        ]
    } else {
        vec![
            Permission::Bluetooth,
            Permission::BluetoothAdmin,
            Permission::AccessFineLocation,
        ]
    }
}

/// Permissions re-checked for every delivered scan result.
pub fn scan_result_permissions(api_level: u32) -> Vec<Permission> {
    let mut permissions = scan_start_permissions(api_level);
    if !permissions.contains(&Permission::AccessFineLocation) {
        permissions.push(Permission::AccessFineLocation);
    }
    permissions
}

/// Formats a permission list as `[A, B]` for log lines and error messages.
pub fn describe(permissions: &[Permission]) -> String {
    let names: Vec<&str> = permissions.iter().map(Permission::name).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_permissions_by_api_level() {
        assert!(scan_start_permissions(31).contains(&Permission::BluetoothScan));
        assert!(!scan_start_permissions(31).contains(&Permission::AccessFineLocation));

        assert!(scan_start_permissions(30).contains(&Permission::AccessFineLocation));
        assert!(!scan_start_permissions(30).contains(&Permission::BluetoothScan));
    }

    #[test]
    fn test_result_permissions_add_location() {
        let permissions = scan_result_permissions(33);
        assert_eq!(permissions.len(), 4);
        assert!(permissions.contains(&Permission::AccessFineLocation));

        assert_eq!(scan_result_permissions(29), scan_start_permissions(29));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&[Permission::BluetoothScan, Permission::AccessFineLocation]),
            "[BLUETOOTH_SCAN, ACCESS_FINE_LOCATION]"
        );
    }
}
