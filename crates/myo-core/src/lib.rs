//! BLE discovery, streaming and UDP relay for Myo armbands.
//!
//! This crate is the native agent side of the Myo bridge. It scans for the
//! configured armbands, connects each one, enables raw EMG and IMU streaming
//! and republishes the raw samples as UDP datagrams for a downstream
//! controller.
//!
//! # Features
//!
//! - **Discovery**: match scanned peripherals against configured addresses
//! - **Armband sessions**: connect, enable services, decode notifications
//! - **Event stream**: every state change and sample as an [`AgentEvent`]
//! - **UDP relay**: raw datagrams per armband, rate logging, vibrate requests
//! - **Configuration**: TOML-loadable [`AgentConfig`] with a strict list policy
//!
//! # Platform Differences
//!
//! On Linux and Windows armbands are matched by Bluetooth MAC address. macOS
//! hides MAC addresses, so the CoreBluetooth peripheral UUID is used as the
//! identifier instead and must be configured in its place.
//!
//! # Quick Start
//!
//! ```no_run
//! use myo_core::{AgentConfig, AgentEvent, DiscoveryAgent};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = DiscoveryAgent::new(AgentConfig::default())?;
//!     let mut events = agent.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let AgentEvent::Ready { armband, .. } = event {
//!                 println!("{armband} is streaming");
//!             }
//!         }
//!     });
//!
//!     agent.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod armband;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod mock;
pub mod record;
pub mod relay;
pub mod traits;
pub mod util;

pub use myo_types::types;
pub use myo_types::uuid;

pub use agent::{DiscoveryAgent, get_adapter};
pub use armband::{ArmbandSession, decode_notification};
pub use commands::{StreamMode, SleepMode};
pub use config::{AgentConfig, ArmbandTarget, ConnectionConfig, RelayConfig};
pub use error::{Error, Result};
pub use events::{
    AdapterState, AgentEvent, ArmbandId, DisconnectReason, EventDispatcher, EventReceiver,
    EventSender,
};
pub use mock::MockArmband;
pub use record::{ArmbandRecord, RecordSnapshot, SharedRecord};
pub use relay::{RateReport, Relay, RelayCounters, RelayOptions};
pub use traits::Armband;
pub use util::{create_identifier, format_peripheral_id};

pub use myo_types::uuid as uuids;
pub use myo_types::{ArmbandService, ArmbandState, EmgPacket, FirmwareVersion, ImuSample};
