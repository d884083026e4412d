//! GATT service and characteristic UUIDs for the Safera Sense.
//!
//! The UUID to name to handle mapping is fixed for this device family;
//! handle numbers below are the ones observed during GATT discovery
//! and are kept for cross-referencing captures. Handles for the event
//! log and DCV characteristics were never captured.

use uuid::Uuid;

/// Standard Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);

/// Vendor main service hosting all Safera characteristics.
pub const MAIN_SERVICE: Uuid = Uuid::from_u128(0x0000f00d_1212_efde_1523_785fef13d123);

/// Manufacturer Name String (handle 15).
pub const MANUFACTURER: Uuid = Uuid::from_u128(0x00002a29_0000_1000_8000_00805f9b34fb);
/// Model Number String (handle 17).
pub const MODEL_NUMBER: Uuid = Uuid::from_u128(0x00002a24_0000_1000_8000_00805f9b34fb);
/// Serial Number String (handle 19).
pub const SERIAL_NUMBER: Uuid = Uuid::from_u128(0x00002a25_0000_1000_8000_00805f9b34fb);
/// Hardware Revision String (handle 21).
pub const HARDWARE_REV: Uuid = Uuid::from_u128(0x00002a27_0000_1000_8000_00805f9b34fb);
/// Firmware Revision String (handle 23).
pub const FIRMWARE_REV: Uuid = Uuid::from_u128(0x00002a26_0000_1000_8000_00805f9b34fb);
/// Software Revision String (handle 25).
pub const SOFTWARE_REV: Uuid = Uuid::from_u128(0x00002a28_0000_1000_8000_00805f9b34fb);

/// Sensor report payload, read/notify (handle 32).
pub const SENSOR_REPORT: Uuid = Uuid::from_u128(0x0000beef_1212_efde_1523_785fef13d123);
/// GDT command pipe for operations that move auxiliary data, write
/// (handle 35).
pub const GDT_COMMAND: Uuid = Uuid::from_u128(0x0000abba_1212_efde_1523_785fef13d123);
/// 8-byte device command channel (fan, light, clock), write.
pub const DEVICE_COMMAND: Uuid = Uuid::from_u128(0x0000babe_1212_efde_1523_785fef13d123);
/// Network settings record, read and write-settings (handle 55).
pub const NETWORK_SETTINGS: Uuid = Uuid::from_u128(0x0000abd1_1212_efde_1523_785fef13d123);
/// Event log notification.
pub const EVENT_LOG: Uuid = Uuid::from_u128(0x0000abd2_1212_efde_1523_785fef13d123);
/// Demand-controlled ventilation report notification.
pub const DCV_REPORT: Uuid = Uuid::from_u128(0x0000abd3_1212_efde_1523_785fef13d123);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_uuids_share_the_base() {
        for uuid in [SENSOR_REPORT, GDT_COMMAND, DEVICE_COMMAND, NETWORK_SETTINGS, EVENT_LOG, DCV_REPORT] {
            assert_eq!(
                uuid.as_u128() & ((1u128 << 96) - 1),
                MAIN_SERVICE.as_u128() & ((1u128 << 96) - 1)
            );
        }
    }
}
