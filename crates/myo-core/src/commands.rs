//! BLE command bytes for Myo armbands.
//!
//! Commands are written to the control service's command characteristic.
//! Every command is `[opcode, payload_len, payload...]`.

use crate::error::{Error, Result};

/// Set EMG / IMU / classifier streaming modes.
/// Format: `[SET_MODE, 3, emg_mode, imu_mode, classifier_mode]`
pub const SET_MODE: u8 = 0x01;

/// Vibrate the armband.
/// Format: `[VIBRATE, 1, duration]`, duration `0..=3`
pub const VIBRATE: u8 = 0x03;

/// Set the sleep behaviour.
/// Format: `[SET_SLEEP_MODE, 1, mode]`
pub const SET_SLEEP_MODE: u8 = 0x09;

/// Longest vibration the armband supports.
pub const MAX_VIBRATION: u8 = 3;

/// EMG streaming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EmgMode {
    None = 0x00,
    /// Filtered, rectified EMG (not streamed raw).
    Filtered = 0x02,
    /// Raw EMG on the four raw EMG characteristics.
    Raw = 0x03,
}

/// IMU streaming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ImuMode {
    None = 0x00,
    /// Orientation, accelerometer and gyroscope data.
    Data = 0x01,
    /// Motion events only.
    Events = 0x02,
    All = 0x03,
}

/// On-board pose classifier mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClassifierMode {
    Disabled = 0x00,
    Enabled = 0x01,
}

/// Sleep behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SleepMode {
    /// Sleep after a period of inactivity.
    Normal = 0x00,
    NeverSleep = 0x01,
}

/// A complete streaming mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMode {
    pub emg: EmgMode,
    pub imu: ImuMode,
    pub classifier: ClassifierMode,
}

impl StreamMode {
    /// Raw EMG and IMU data, classifier off. The mode the agent requests.
    pub const STREAMING: StreamMode = StreamMode {
        emg: EmgMode::Raw,
        imu: ImuMode::Data,
        classifier: ClassifierMode::Disabled,
    };

    /// Command bytes selecting this mode.
    pub fn to_bytes(&self) -> [u8; 5] {
        [
            SET_MODE,
            3,
            self.emg as u8,
            self.imu as u8,
            self.classifier as u8,
        ]
    }
}

impl Default for StreamMode {
    fn default() -> Self {
        Self::STREAMING
    }
}

/// Command bytes selecting a sleep mode.
pub fn sleep_mode(mode: SleepMode) -> [u8; 3] {
    [SET_SLEEP_MODE, 1, mode as u8]
}

/// Command bytes for a vibration.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] if `duration` exceeds [`MAX_VIBRATION`].
pub fn vibrate(duration: u8) -> Result<[u8; 3]> {
    if duration > MAX_VIBRATION {
        return Err(Error::InvalidData(format!(
            "vibration duration {} out of range 0..={}",
            duration, MAX_VIBRATION
        )));
    }
    Ok([VIBRATE, 1, duration])
}
