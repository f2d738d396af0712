//! Trait abstractions for armband operations.
//!
//! This module provides the [`Armband`] trait that abstracts over live
//! Bluetooth sessions and mock armbands for testing.

use async_trait::async_trait;

use myo_types::FirmwareVersion;

use crate::commands::StreamMode;
use crate::error::Result;

/// Operations on a connected Myo armband.
///
/// The UDP relay drives an armband only through this trait, so it works
/// unchanged with [`crate::ArmbandSession`] and [`crate::MockArmband`].
///
/// # Example
///
/// ```ignore
/// use myo_core::{Armband, Result};
///
/// async fn buzz<A: Armband>(armband: &A) -> Result<()> {
///     armband.vibrate(1).await
/// }
/// ```
#[async_trait]
pub trait Armband: Send + Sync {
    /// Normalized hardware address.
    fn address(&self) -> &str;

    /// Check if the armband is connected.
    async fn is_connected(&self) -> bool;

    /// Disconnect from the armband.
    async fn disconnect(&self) -> Result<()>;

    /// Read the battery level (0-100).
    async fn read_battery(&self) -> Result<u8>;

    /// Read the firmware version.
    async fn read_firmware_version(&self) -> Result<FirmwareVersion>;

    /// Vibrate for `duration` (`0..=3`).
    async fn vibrate(&self, duration: u8) -> Result<()>;

    /// Select EMG / IMU / classifier streaming modes.
    async fn set_mode(&self, mode: StreamMode) -> Result<()>;
}
