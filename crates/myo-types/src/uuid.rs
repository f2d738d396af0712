//! Bluetooth UUIDs for Myo armbands.
//!
//! Thalmic services and characteristics share a 128-bit base UUID
//! `d506XXXX-a904-deb9-4748-2c7f4a124842`. Standard services use the
//! Bluetooth SIG base `0000XXXX-0000-1000-8000-00805f9b34fb`.

use uuid::{Uuid, uuid};

// --- Thalmic Service UUIDs ---

/// Control service (info, firmware version, command).
pub const CONTROL_SERVICE: Uuid = uuid!("d5060001-a904-deb9-4748-2c7f4a124842");

/// IMU data service.
pub const IMU_SERVICE: Uuid = uuid!("d5060002-a904-deb9-4748-2c7f4a124842");

/// Classifier event service.
pub const CLASSIFIER_SERVICE: Uuid = uuid!("d5060003-a904-deb9-4748-2c7f4a124842");

/// Processed EMG service.
pub const EMG_SERVICE: Uuid = uuid!("d5060004-a904-deb9-4748-2c7f4a124842");

/// Raw EMG data service.
pub const RAW_EMG_SERVICE: Uuid = uuid!("d5060005-a904-deb9-4748-2c7f4a124842");

// --- Thalmic Characteristic UUIDs ---

/// Armband info (serial, unlock pose, active classifier...).
pub const MYO_INFO: Uuid = uuid!("d5060101-a904-deb9-4748-2c7f4a124842");

/// Firmware version (four little-endian u16).
pub const FIRMWARE_VERSION: Uuid = uuid!("d5060201-a904-deb9-4748-2c7f4a124842");

/// Command characteristic (mode, vibrate, sleep).
pub const COMMAND: Uuid = uuid!("d5060401-a904-deb9-4748-2c7f4a124842");

/// IMU notification characteristic.
pub const IMU_DATA: Uuid = uuid!("d5060402-a904-deb9-4748-2c7f4a124842");

/// Classifier indication characteristic.
pub const CLASSIFIER_EVENT: Uuid = uuid!("d5060103-a904-deb9-4748-2c7f4a124842");

/// Raw EMG notification characteristic 0.
pub const EMG_DATA_0: Uuid = uuid!("d5060105-a904-deb9-4748-2c7f4a124842");

/// Raw EMG notification characteristic 1.
pub const EMG_DATA_1: Uuid = uuid!("d5060205-a904-deb9-4748-2c7f4a124842");

/// Raw EMG notification characteristic 2.
pub const EMG_DATA_2: Uuid = uuid!("d5060305-a904-deb9-4748-2c7f4a124842");

/// Raw EMG notification characteristic 3.
pub const EMG_DATA_3: Uuid = uuid!("d5060405-a904-deb9-4748-2c7f4a124842");

/// All four raw EMG characteristics, in channel-bank order.
pub const EMG_DATA: [Uuid; 4] = [EMG_DATA_0, EMG_DATA_1, EMG_DATA_2, EMG_DATA_3];

// --- Standard BLE Service UUIDs ---

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");

/// Generic Attribute service.
pub const GATT_SERVICE: Uuid = uuid!("00001801-0000-1000-8000-00805f9b34fb");

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

// --- Standard Characteristic UUIDs ---

/// Device name characteristic.
pub const DEVICE_NAME: Uuid = uuid!("00002a00-0000-1000-8000-00805f9b34fb");

/// Battery level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

/// Manufacturer name string characteristic.
pub const MANUFACTURER_NAME: Uuid = uuid!("00002a29-0000-1000-8000-00805f9b34fb");

/// Manufacturer name reported by genuine armbands.
pub const THALMIC_MANUFACTURER: &str = "Thalmic Labs";

/// Expand a 16-bit Thalmic short UUID into its 128-bit form.
///
/// ```
/// use myo_types::uuid::{myo_uuid, COMMAND};
///
/// assert_eq!(myo_uuid(0x0401), COMMAND);
/// ```
pub const fn myo_uuid(short: u16) -> Uuid {
    Uuid::from_u128(0xd5060000_a904_deb9_4748_2c7f4a124842 | ((short as u128) << 96))
}

/// Expand a 16-bit Bluetooth SIG short UUID into its 128-bit form.
///
/// ```
/// use myo_types::uuid::{sig_uuid, BATTERY_LEVEL};
///
/// assert_eq!(sig_uuid(0x2a19), BATTERY_LEVEL);
/// ```
pub const fn sig_uuid(short: u16) -> Uuid {
    Uuid::from_u128(0x00000000_0000_1000_8000_00805f9b34fb | ((short as u128) << 96))
}

/// Human-readable name of a known service.
pub fn service_name(uuid: &Uuid) -> Option<&'static str> {
    let name = match *uuid {
        GAP_SERVICE => "Generic Access",
        GATT_SERVICE => "Generic Attribute",
        DEVICE_INFO_SERVICE => "Device Information",
        BATTERY_SERVICE => "Battery Service",
        CONTROL_SERVICE => "Myo Attribute",
        IMU_SERVICE => "IMU Data",
        CLASSIFIER_SERVICE => "Classifier Data",
        EMG_SERVICE => "EMG Data",
        RAW_EMG_SERVICE => "Raw EMG",
        _ => return None,
    };
    Some(name)
}
