//! Agent event stream.
//!
//! Discovery, armband sessions and relays communicate only through
//! [`AgentEvent`]s published on a broadcast channel. Any number of listeners
//! can subscribe; publishing with no listeners is not an error.

use std::fmt;

use btleplug::api::CentralState;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use myo_types::{ArmbandService, EmgPacket, ImuSample};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Identity of a tracked armband: its address and where its data is relayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArmbandId {
    /// Normalized hardware address (lowercase, no separators).
    pub address: String,
    /// Destination UDP port.
    pub port: u16,
    /// Destination host.
    pub ip: String,
}

impl ArmbandId {
    pub fn new(address: impl Into<String>, port: u16, ip: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            ip: ip.into(),
        }
    }
}

impl fmt::Display for ArmbandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}:{}", self.address, self.ip, self.port)
    }
}

/// Power state reported by the Bluetooth adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    PoweredOn,
    PoweredOff,
    Unknown,
}

impl AdapterState {
    pub fn is_powered_on(&self) -> bool {
        matches!(self, AdapterState::PoweredOn)
    }
}

impl From<CentralState> for AdapterState {
    fn from(state: CentralState) -> Self {
        match state {
            CentralState::PoweredOn => AdapterState::PoweredOn,
            CentralState::PoweredOff => AdapterState::PoweredOff,
            _ => AdapterState::Unknown,
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterState::PoweredOn => "powered_on",
            AdapterState::PoweredOff => "powered_off",
            AdapterState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Events emitted by the agent.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum AgentEvent {
    /// The adapter reported a power state.
    AdapterState { state: AdapterState },
    /// A configured armband was seen during scanning.
    Discovered { armband: ArmbandId },
    /// Connection and service discovery started.
    Connecting { armband: ArmbandId },
    /// Services are enabled and data is streaming.
    Ready {
        armband: ArmbandId,
        services: Vec<ArmbandService>,
    },
    /// Battery level (percent).
    Battery { armband: ArmbandId, level: u8 },
    /// One EMG notification from characteristic bank `0..=3`.
    Emg {
        armband: ArmbandId,
        bank: u8,
        packet: EmgPacket,
        raw: Vec<u8>,
    },
    /// One IMU notification.
    Imu {
        armband: ArmbandId,
        sample: ImuSample,
        raw: Vec<u8>,
    },
    /// The armband is no longer connected.
    Disconnected {
        armband: ArmbandId,
        reason: DisconnectReason,
    },
}

impl AgentEvent {
    /// The armband this event concerns, if any.
    pub fn armband(&self) -> Option<&ArmbandId> {
        match self {
            AgentEvent::AdapterState { .. } => None,
            AgentEvent::Discovered { armband }
            | AgentEvent::Connecting { armband }
            | AgentEvent::Ready { armband, .. }
            | AgentEvent::Battery { armband, .. }
            | AgentEvent::Emg { armband, .. }
            | AgentEvent::Imu { armband, .. }
            | AgentEvent::Disconnected { armband, .. } => Some(armband),
        }
    }
}

/// Reason for disconnection.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Disconnection requested locally.
    UserRequested,
    /// The adapter left the powered-on state.
    AdapterPoweredOff,
    /// The peripheral dropped the link.
    LinkLost,
    /// BLE error occurred.
    BleError(String),
}

/// Sender for agent events.
pub type EventSender = broadcast::Sender<AgentEvent>;

/// Receiver for agent events.
pub type EventReceiver = broadcast::Receiver<AgentEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: AgentEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the sender for direct use.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armband() -> ArmbandId {
        ArmbandId::new("f01ccda72c85", 15001, "127.0.0.1")
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_to_all_subscribers() {
        let dispatcher = EventDispatcher::default();
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(AgentEvent::Battery {
            armband: armband(),
            level: 80,
        });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                AgentEvent::Battery { level, .. } => assert_eq!(level, 80),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn test_send_without_receivers() {
        let dispatcher = EventDispatcher::new(4);
        dispatcher.send(AgentEvent::AdapterState {
            state: AdapterState::PoweredOn,
        });
        assert_eq!(dispatcher.receiver_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = AgentEvent::Discovered { armband: armband() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "discovered");
        assert_eq!(json["armband"]["port"], 15001);

        let event = AgentEvent::AdapterState {
            state: AdapterState::PoweredOff,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"state\":\"powered_off\""));
    }

    #[test]
    fn test_event_armband() {
        let event = AgentEvent::Disconnected {
            armband: armband(),
            reason: DisconnectReason::LinkLost,
        };
        assert_eq!(event.armband().map(|a| a.port), Some(15001));
        let event = AgentEvent::AdapterState {
            state: AdapterState::Unknown,
        };
        assert!(event.armband().is_none());
    }

    #[test]
    fn test_adapter_state_from_central() {
        assert_eq!(
            AdapterState::from(CentralState::PoweredOn),
            AdapterState::PoweredOn
        );
        assert_eq!(
            AdapterState::from(CentralState::PoweredOff),
            AdapterState::PoweredOff
        );
        assert!(!AdapterState::Unknown.is_powered_on());
    }

    #[test]
    fn test_armband_id_display() {
        assert_eq!(armband().to_string(), "f01ccda72c85 -> 127.0.0.1:15001");
    }
}
