//! Live armband sessions.
//!
//! An [`ArmbandSession`] owns the BLE connection to one discovered Myo. On
//! connect it enables the data services the relay needs, then decodes every
//! notification into an [`AgentEvent`] on the shared event stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use myo_types::uuid::{BATTERY_LEVEL, COMMAND, EMG_DATA, FIRMWARE_VERSION, IMU_DATA};
use myo_types::{ArmbandService, ArmbandState, EmgPacket, FirmwareVersion, ImuSample, parse_battery};

use crate::commands::{self, SleepMode, StreamMode};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::events::{AgentEvent, ArmbandId, DisconnectReason, EventDispatcher};
use crate::record::SharedRecord;
use crate::traits::Armband;

/// A connected, streaming Myo armband.
///
/// Not `Clone`: the session owns the connection and its notification task.
/// Share it behind an `Arc`.
///
/// # Cleanup
///
/// Call [`ArmbandSession::disconnect`] before dropping. Dropping a live
/// session logs a warning and disconnects in the background.
pub struct ArmbandSession {
    /// Kept alive for the lifetime of the peripheral connection.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    record: SharedRecord,
    events: EventDispatcher,
    characteristics_cache: RwLock<HashMap<Uuid, Characteristic>>,
    notification_handles: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
    disconnected: AtomicBool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for ArmbandSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmbandSession")
            .field("armband", self.record.id())
            .field("disconnected", &self.disconnected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ArmbandSession {
    /// Connect to a discovered armband and start streaming.
    ///
    /// Moves the record through `Connecting` to `Ready`. On failure the record
    /// is marked disconnected and a `Disconnected` event is emitted before the
    /// error is returned.
    #[tracing::instrument(level = "info", skip_all, fields(armband = %record.id()))]
    pub async fn connect(
        adapter: Adapter,
        peripheral: Peripheral,
        record: SharedRecord,
        events: EventDispatcher,
        config: ConnectionConfig,
    ) -> Result<Self> {
        match Self::establish(adapter, peripheral.clone(), record.clone(), events.clone(), config)
            .await
        {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!("Failed to start armband session: {}", e);
                if record.mark_disconnected().await {
                    events.send(AgentEvent::Disconnected {
                        armband: record.id().clone(),
                        reason: DisconnectReason::BleError(e.to_string()),
                    });
                }
                if let Err(err) = peripheral.disconnect().await {
                    debug!("Disconnect after failed session start: {}", err);
                }
                Err(e)
            }
        }
    }

    async fn establish(
        adapter: Adapter,
        peripheral: Peripheral,
        record: SharedRecord,
        events: EventDispatcher,
        config: ConnectionConfig,
    ) -> Result<Self> {
        record.set_state(ArmbandState::Connecting).await;
        events.send(AgentEvent::Connecting {
            armband: record.id().clone(),
        });

        info!("Connecting to armband...");
        timeout(config.connect_timeout(), peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to armband", config.connect_timeout()))??;
        info!("Connected!");

        timeout(config.discovery_timeout(), peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", config.discovery_timeout()))??;

        let services = peripheral.services();
        debug!("Found {} services", services.len());

        let mut characteristics_cache = HashMap::new();
        for service in &services {
            debug!("  Service: {}", service.uuid);
            for char in &service.characteristics {
                debug!("    Characteristic: {}", char.uuid);
                characteristics_cache.insert(char.uuid, char.clone());
            }
        }

        let session = Self {
            adapter,
            peripheral,
            record,
            events,
            characteristics_cache: RwLock::new(characteristics_cache),
            notification_handles: tokio::sync::Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
            config,
        };
        session.enable_services().await?;
        Ok(session)
    }

    /// Subscribe to battery, EMG and IMU, select raw streaming and keep the
    /// armband awake.
    async fn enable_services(&self) -> Result<()> {
        let stream = self.peripheral.notifications().await?;
        let armband = self.record.id().clone();
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let mut stream = stream;
            while let Some(notification) = stream.next().await {
                if let Some(event) = decode_notification(&armband, notification.uuid, &notification.value)
                {
                    events.send(event);
                }
            }
            debug!(armband = %armband.address, "Notification stream ended");
        });
        self.notification_handles.lock().await.push(handle);

        self.subscribe(BATTERY_LEVEL).await?;
        self.record.mark_service_enabled(ArmbandService::Battery).await;

        for uuid in EMG_DATA {
            self.subscribe(uuid).await?;
        }
        self.record.mark_service_enabled(ArmbandService::Emg).await;

        self.subscribe(IMU_DATA).await?;
        self.record.mark_service_enabled(ArmbandService::Imu).await;

        self.set_mode(StreamMode::STREAMING).await?;
        self.write_characteristic(COMMAND, &commands::sleep_mode(SleepMode::NeverSleep))
            .await?;

        let level = self.read_battery().await?;
        info!("Battery level {}%", level);
        self.events.send(AgentEvent::Battery {
            armband: self.record.id().clone(),
            level,
        });

        self.record.set_state(ArmbandState::Ready).await;
        self.events.send(AgentEvent::Ready {
            armband: self.record.id().clone(),
            services: self.record.services().await,
        });
        info!("Armband ready");
        Ok(())
    }

    async fn subscribe(&self, uuid: Uuid) -> Result<()> {
        let characteristic = self.find_characteristic(uuid).await?;
        self.peripheral.subscribe(&characteristic).await?;
        debug!("Subscribed to {}", uuid);
        Ok(())
    }

    pub fn id(&self) -> &ArmbandId {
        self.record.id()
    }

    pub fn record(&self) -> &SharedRecord {
        &self.record
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub async fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
            && self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        let cache = self.characteristics_cache.read().await;
        cache.get(&uuid).cloned().ok_or_else(|| {
            Error::characteristic_not_found(uuid.to_string(), self.peripheral.services().len())
        })
    }

    pub async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let characteristic = self.find_characteristic(uuid).await?;
        let read_timeout = self.config.read_timeout();
        let data = timeout(read_timeout, self.peripheral.read(&characteristic))
            .await
            .map_err(|_| Error::timeout(format!("read characteristic {}", uuid), read_timeout))??;
        Ok(data)
    }

    pub async fn write_characteristic(&self, uuid: Uuid, data: &[u8]) -> Result<()> {
        let characteristic = self.find_characteristic(uuid).await?;
        let write_timeout = self.config.write_timeout();
        timeout(
            write_timeout,
            self.peripheral
                .write(&characteristic, data, WriteType::WithResponse),
        )
        .await
        .map_err(|_| Error::timeout(format!("write characteristic {}", uuid), write_timeout))??;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn read_battery(&self) -> Result<u8> {
        let data = self.read_characteristic(BATTERY_LEVEL).await?;
        Ok(parse_battery(&data)?)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn read_firmware_version(&self) -> Result<FirmwareVersion> {
        let data = self.read_characteristic(FIRMWARE_VERSION).await?;
        Ok(FirmwareVersion::from_bytes(&data)?)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn vibrate(&self, duration: u8) -> Result<()> {
        let bytes = commands::vibrate(duration)?;
        self.write_characteristic(COMMAND, &bytes).await
    }

    pub async fn set_mode(&self, mode: StreamMode) -> Result<()> {
        self.write_characteristic(COMMAND, &mode.to_bytes()).await
    }

    /// Disconnect at the user's request.
    pub async fn disconnect(&self) -> Result<()> {
        self.disconnect_with(DisconnectReason::UserRequested).await
    }

    /// Stop notifications, mark the record disconnected and drop the link.
    ///
    /// The `Disconnected` event is emitted only if the record was not already
    /// disconnected (for example by an adapter power-off).
    #[tracing::instrument(level = "info", skip(self), fields(armband = %self.record.id()))]
    pub async fn disconnect_with(&self, reason: DisconnectReason) -> Result<()> {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Disconnecting from armband...");

        {
            let mut handles = self.notification_handles.lock().await;
            for handle in handles.drain(..) {
                handle.abort();
            }
        }

        if self.record.mark_disconnected().await {
            self.events.send(AgentEvent::Disconnected {
                armband: self.record.id().clone(),
                reason,
            });
        }

        self.peripheral.disconnect().await?;
        Ok(())
    }

    /// Wait for the peripheral to stop reporting a connection, polling every
    /// `interval`. Returns immediately once the session is disconnected.
    pub async fn wait_for_link_loss(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if !self.is_connected().await || self.record.is_disconnected().await {
                return;
            }
        }
    }
}

impl Drop for ArmbandSession {
    fn drop(&mut self) {
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            warn!(
                armband = %self.record.id(),
                "ArmbandSession dropped without calling disconnect() - performing best-effort cleanup"
            );

            if let Ok(mut handles) = self.notification_handles.try_lock() {
                for handle in handles.drain(..) {
                    handle.abort();
                }
            }

            let peripheral = self.peripheral.clone();
            let record = self.record.clone();
            let events = self.events.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if record.mark_disconnected().await {
                        events.send(AgentEvent::Disconnected {
                            armband: record.id().clone(),
                            reason: DisconnectReason::UserRequested,
                        });
                    }
                    if let Err(e) = peripheral.disconnect().await {
                        debug!(
                            armband = %record.id(),
                            error = %e,
                            "Best-effort disconnect failed (armband may already be disconnected)"
                        );
                    }
                });
            }
        }
    }
}

#[async_trait]
impl Armband for ArmbandSession {
    fn address(&self) -> &str {
        &self.record.id().address
    }

    async fn is_connected(&self) -> bool {
        ArmbandSession::is_connected(self).await
    }

    async fn disconnect(&self) -> Result<()> {
        ArmbandSession::disconnect(self).await
    }

    async fn read_battery(&self) -> Result<u8> {
        ArmbandSession::read_battery(self).await
    }

    async fn read_firmware_version(&self) -> Result<FirmwareVersion> {
        ArmbandSession::read_firmware_version(self).await
    }

    async fn vibrate(&self, duration: u8) -> Result<()> {
        ArmbandSession::vibrate(self, duration).await
    }

    async fn set_mode(&self, mode: StreamMode) -> Result<()> {
        ArmbandSession::set_mode(self, mode).await
    }
}

/// Decode one notification into an event.
///
/// Returns `None` for characteristics the agent does not stream and for
/// payloads that fail to parse (logged at debug).
pub fn decode_notification(armband: &ArmbandId, uuid: Uuid, value: &[u8]) -> Option<AgentEvent> {
    if let Some(bank) = EMG_DATA.iter().position(|u| *u == uuid) {
        return match EmgPacket::from_bytes(value) {
            Ok(packet) => {
                trace!(armband = %armband.address, bank, ?packet, "EMG");
                Some(AgentEvent::Emg {
                    armband: armband.clone(),
                    bank: bank as u8,
                    packet,
                    raw: value.to_vec(),
                })
            }
            Err(e) => {
                debug!(armband = %armband.address, "Bad EMG notification: {}", e);
                None
            }
        };
    }

    if uuid == IMU_DATA {
        return match ImuSample::from_bytes(value) {
            Ok(sample) => {
                trace!(armband = %armband.address, ?sample, "IMU");
                Some(AgentEvent::Imu {
                    armband: armband.clone(),
                    sample,
                    raw: value.to_vec(),
                })
            }
            Err(e) => {
                debug!(armband = %armband.address, "Bad IMU notification: {}", e);
                None
            }
        };
    }

    if uuid == BATTERY_LEVEL {
        return match parse_battery(value) {
            Ok(level) => {
                debug!(armband = %armband.address, level, "Battery");
                Some(AgentEvent::Battery {
                    armband: armband.clone(),
                    level,
                })
            }
            Err(e) => {
                debug!(armband = %armband.address, "Bad battery notification: {}", e);
                None
            }
        };
    }

    trace!(armband = %armband.address, %uuid, "Ignoring notification");
    None
}
