//! Core types for armband samples and peripheral state.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Number of EMG electrodes on the armband.
pub const EMG_CHANNELS: usize = 8;

/// Bytes in one raw EMG notification (two samples of eight channels).
pub const EMG_PACKET_BYTES: usize = 16;

/// Bytes in one IMU notification (ten little-endian i16 values).
pub const IMU_PACKET_BYTES: usize = 20;

/// Bytes in the firmware version characteristic.
pub const FIRMWARE_VERSION_BYTES: usize = 8;

/// Raw orientation units per unit quaternion.
pub const ORIENTATION_SCALE: f32 = 16384.0;

/// Raw accelerometer units per g.
pub const ACCELEROMETER_SCALE: f32 = 2048.0;

/// Raw gyroscope units per deg/s.
pub const GYROSCOPE_SCALE: f32 = 16.0;

/// Connection state of a tracked armband.
///
/// Records only move forward: `Discovered -> Connecting -> Ready -> Disconnected`.
/// A disconnected record is never revived; rediscovery creates a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArmbandState {
    /// Matched during scanning, not yet connected.
    #[default]
    Discovered,
    /// Connection and service discovery in progress.
    Connecting,
    /// Notifications enabled and streaming.
    Ready,
    /// Connection lost or adapter powered off.
    Disconnected,
}

impl ArmbandState {
    /// Whether the armband currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        matches!(self, ArmbandState::Connecting | ArmbandState::Ready)
    }
}

impl fmt::Display for ArmbandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArmbandState::Discovered => "discovered",
            ArmbandState::Connecting => "connecting",
            ArmbandState::Ready => "ready",
            ArmbandState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// A data-bearing armband service the agent can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArmbandService {
    /// Battery level notifications.
    Battery,
    /// Raw EMG notifications (all four characteristics).
    Emg,
    /// IMU notifications.
    Imu,
    /// Classifier indications.
    Classifier,
}

/// One raw EMG notification: two consecutive samples of eight signed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmgPacket {
    /// The earlier sample.
    pub sample1: [i8; EMG_CHANNELS],
    /// The later sample.
    pub sample2: [i8; EMG_CHANNELS],
}

impl EmgPacket {
    /// Parse an EMG notification.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] unless `data` is exactly
    /// [`EMG_PACKET_BYTES`] long.
    ///
    /// ```
    /// use myo_types::EmgPacket;
    ///
    /// let mut raw = [0u8; 16];
    /// raw[0] = 0xFF; // -1
    /// raw[8] = 5;
    /// let packet = EmgPacket::from_bytes(&raw).unwrap();
    /// assert_eq!(packet.sample1[0], -1);
    /// assert_eq!(packet.sample2[0], 5);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() != EMG_PACKET_BYTES {
            return Err(ParseError::InsufficientBytes {
                expected: EMG_PACKET_BYTES,
                actual: data.len(),
            });
        }

        let mut sample1 = [0i8; EMG_CHANNELS];
        let mut sample2 = [0i8; EMG_CHANNELS];
        for i in 0..EMG_CHANNELS {
            sample1[i] = data[i] as i8;
            sample2[i] = data[i + EMG_CHANNELS] as i8;
        }

        Ok(Self { sample1, sample2 })
    }

    /// Both samples in arrival order.
    pub fn samples(&self) -> [[i8; EMG_CHANNELS]; 2] {
        [self.sample1, self.sample2]
    }
}

/// One IMU notification, scaled to physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImuSample {
    /// Orientation quaternion `[w, x, y, z]`.
    pub orientation: [f32; 4],
    /// Acceleration in g.
    pub accelerometer: [f32; 3],
    /// Angular rate in deg/s.
    pub gyroscope: [f32; 3],
}

impl ImuSample {
    /// Parse an IMU notification.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] unless `data` is exactly
    /// [`IMU_PACKET_BYTES`] long.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        use bytes::Buf;

        if data.len() != IMU_PACKET_BYTES {
            return Err(ParseError::InsufficientBytes {
                expected: IMU_PACKET_BYTES,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let mut orientation = [0.0f32; 4];
        for v in orientation.iter_mut() {
            *v = f32::from(buf.get_i16_le()) / ORIENTATION_SCALE;
        }
        let mut accelerometer = [0.0f32; 3];
        for v in accelerometer.iter_mut() {
            *v = f32::from(buf.get_i16_le()) / ACCELEROMETER_SCALE;
        }
        let mut gyroscope = [0.0f32; 3];
        for v in gyroscope.iter_mut() {
            *v = f32::from(buf.get_i16_le()) / GYROSCOPE_SCALE;
        }

        Ok(Self {
            orientation,
            accelerometer,
            gyroscope,
        })
    }
}

/// Armband firmware version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub hardware_rev: u16,
}

impl FirmwareVersion {
    /// Parse the firmware version characteristic.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        use bytes::Buf;

        if data.len() < FIRMWARE_VERSION_BYTES {
            return Err(ParseError::InsufficientBytes {
                expected: FIRMWARE_VERSION_BYTES,
                actual: data.len(),
            });
        }

        let mut buf = data;
        Ok(Self {
            major: buf.get_u16_le(),
            minor: buf.get_u16_le(),
            patch: buf.get_u16_le(),
            hardware_rev: buf.get_u16_le(),
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} (rev {})",
            self.major, self.minor, self.patch, self.hardware_rev
        )
    }
}

/// Parse a battery level characteristic value (percent).
pub fn parse_battery(data: &[u8]) -> Result<u8, ParseError> {
    match data.first() {
        Some(&level) if level <= 100 => Ok(level),
        Some(&level) => Err(ParseError::InvalidValue(format!(
            "battery level {} exceeds 100%",
            level
        ))),
        None => Err(ParseError::InsufficientBytes {
            expected: 1,
            actual: 0,
        }),
    }
}

/// Normalize a hardware address for comparison.
///
/// Addresses are accepted with or without `:` separators and in any case,
/// so `F0:1C:CD:A7:2C:85` and `f01ccda72c85` compare equal.
pub fn normalize_address(address: &str) -> String {
    address
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
