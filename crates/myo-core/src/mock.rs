//! Mock armband for testing.
//!
//! [`MockArmband`] implements the [`Armband`] trait without BLE hardware.
//! Commands are recorded instead of written, and failures or latency can be
//! injected to exercise error paths.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use myo_types::FirmwareVersion;

use crate::commands::{self, StreamMode};
use crate::error::{Error, Result};
use crate::traits::Armband;

/// A mock Myo armband.
///
/// # Example
///
/// ```
/// use myo_core::{Armband, MockArmband};
///
/// #[tokio::main]
/// async fn main() {
///     let armband = MockArmband::new();
///     armband.vibrate(2).await.unwrap();
///     assert_eq!(armband.vibrations().await, vec![2]);
/// }
/// ```
pub struct MockArmband {
    address: String,
    connected: AtomicBool,
    battery: AtomicU8,
    firmware: FirmwareVersion,
    mode: RwLock<Option<StreamMode>>,
    /// Raw command bytes in write order.
    writes: RwLock<Vec<Vec<u8>>>,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated command latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    /// Operations left to fail before succeeding again.
    remaining_failures: AtomicU32,
}

impl std::fmt::Debug for MockArmband {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockArmband")
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockArmband {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArmband {
    /// Create a connected mock armband with a random address.
    pub fn new() -> Self {
        Self::with_address(format!("mock{:06x}", rand::random::<u32>() % 0xFFFFFF))
    }

    /// Create a connected mock armband with the given address.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connected: AtomicBool::new(true),
            battery: AtomicU8::new(90),
            firmware: FirmwareVersion {
                major: 1,
                minor: 5,
                patch: 1970,
                hardware_rev: 2,
            },
            mode: RwLock::new(None),
            writes: RwLock::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            latency_ms: AtomicU64::new(0),
            remaining_failures: AtomicU32::new(0),
        }
    }

    pub fn set_battery(&self, level: u8) {
        self.battery.store(level.min(100), Ordering::Relaxed);
    }

    /// Make every operation fail until reset.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Fail the next `count` operations, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Vibration durations requested so far.
    pub async fn vibrations(&self) -> Vec<u8> {
        self.writes
            .read()
            .await
            .iter()
            .filter(|w| w.first() == Some(&commands::VIBRATE))
            .filter_map(|w| w.get(2).copied())
            .collect()
    }

    /// Every command written so far.
    pub async fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.read().await.clone()
    }

    /// The last streaming mode selected.
    pub async fn mode(&self) -> Option<StreamMode> {
        *self.mode.read().await
    }

    fn check_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::Relaxed) {
            Err(Error::NotConnected)
        } else {
            Ok(())
        }
    }

    async fn check_should_fail(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::InvalidData(self.fail_message.read().await.clone()));
        }

        if self.should_fail.load(Ordering::Relaxed) {
            Err(Error::InvalidData(self.fail_message.read().await.clone()))
        } else {
            Ok(())
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        self.check_connected()?;
        self.check_should_fail().await?;
        self.writes.write().await.push(bytes.to_vec());
        Ok(())
    }
}

#[async_trait]
impl Armband for MockArmband {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn read_battery(&self) -> Result<u8> {
        self.check_connected()?;
        self.check_should_fail().await?;
        Ok(self.battery.load(Ordering::Relaxed))
    }

    async fn read_firmware_version(&self) -> Result<FirmwareVersion> {
        self.check_connected()?;
        self.check_should_fail().await?;
        Ok(self.firmware)
    }

    async fn vibrate(&self, duration: u8) -> Result<()> {
        let bytes = commands::vibrate(duration)?;
        self.write(&bytes).await
    }

    async fn set_mode(&self, mode: StreamMode) -> Result<()> {
        self.write(&mode.to_bytes()).await?;
        *self.mode.write().await = Some(mode);
        Ok(())
    }
}
