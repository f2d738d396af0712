//! Peripheral discovery agent.
//!
//! The [`DiscoveryAgent`] owns the configured armband targets and the list of
//! discovered records. It watches the adapter's event stream, matches
//! discovered peripherals against the configured addresses, and hands each
//! match to its own task, which connects an [`ArmbandSession`] and runs a
//! [`Relay`] for it.
//!
//! Discovery itself never retries and has no timeouts. When the adapter leaves
//! the powered-on state every record is marked disconnected and
//! [`DiscoveryAgent::run`] returns [`Error::AdapterUnavailable`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use myo_types::uuid::CONTROL_SERVICE;
use myo_types::normalize_address;

use crate::armband::ArmbandSession;
use crate::config::{AgentConfig, ArmbandTarget};
use crate::error::{Error, Result};
use crate::events::{
    AdapterState, AgentEvent, DisconnectReason, EventDispatcher, EventReceiver,
};
use crate::record::{ArmbandRecord, RecordSnapshot, SharedRecord};
use crate::relay::{Relay, RelayOptions};
use crate::util::{create_identifier, format_peripheral_id};

/// How often a non-relaying session checks its link.
const LINK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::NoAdapter)
}

/// Discovers configured armbands and starts a session for each.
#[derive(Debug)]
pub struct DiscoveryAgent {
    config: AgentConfig,
    targets: Vec<ArmbandTarget>,
    armbands: Vec<SharedRecord>,
    events: EventDispatcher,
    adapter_state: AdapterState,
}

impl DiscoveryAgent {
    /// Create an agent, applying the configuration's length policy.
    pub fn new(config: AgentConfig) -> Result<Self> {
        Self::with_events(config, EventDispatcher::default())
    }

    /// Create an agent publishing on an existing dispatcher.
    pub fn with_events(config: AgentConfig, events: EventDispatcher) -> Result<Self> {
        let targets = config.targets()?;
        Ok(Self {
            config,
            targets,
            armbands: Vec::new(),
            events,
            adapter_state: AdapterState::Unknown,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn targets(&self) -> &[ArmbandTarget] {
        &self.targets
    }

    /// Every record created so far, including disconnected ones.
    pub fn armbands(&self) -> &[SharedRecord] {
        &self.armbands
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn adapter_state(&self) -> AdapterState {
        self.adapter_state
    }

    /// Position of `identifier` in the configured address list.
    pub fn target_index(&self, identifier: &str) -> Option<usize> {
        let identifier = normalize_address(identifier);
        self.targets.iter().position(|t| t.address == identifier)
    }

    /// Snapshots of every record.
    pub async fn snapshot(&self) -> Vec<RecordSnapshot> {
        let mut snapshots = Vec::with_capacity(self.armbands.len());
        for record in &self.armbands {
            snapshots.push(record.snapshot().await);
        }
        snapshots
    }

    /// Handle a peripheral seen during scanning.
    ///
    /// If `identifier` is configured and no live record exists for it, a new
    /// record is created with the port and ip at the same list position, a
    /// `Discovered` event is emitted and the record is returned. Otherwise
    /// returns `None`.
    pub async fn on_peripheral_discovered(&mut self, identifier: &str) -> Option<SharedRecord> {
        let index = self.target_index(identifier)?;
        let target = &self.targets[index];

        for record in &self.armbands {
            if record.address() == target.address && !record.is_disconnected().await {
                trace!(armband = %target.address, "Already tracking armband");
                return None;
            }
        }

        let record = ArmbandRecord::shared(target.id());
        info!("Discovered armband {}", record.id());
        self.armbands.push(Arc::clone(&record));
        self.events.send(AgentEvent::Discovered {
            armband: record.id().clone(),
        });
        Some(record)
    }

    /// Handle a peripheral dropping its link.
    pub async fn on_peripheral_disconnected(&mut self, identifier: &str) -> Option<SharedRecord> {
        let identifier = normalize_address(identifier);
        for record in &self.armbands {
            if record.address() == identifier && record.mark_disconnected().await {
                info!("Armband {} disconnected", record.id());
                self.events.send(AgentEvent::Disconnected {
                    armband: record.id().clone(),
                    reason: DisconnectReason::LinkLost,
                });
                return Some(Arc::clone(record));
            }
        }
        None
    }

    /// Handle an adapter power-state report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterUnavailable`] for any state other than powered
    /// on, after marking every record disconnected.
    pub async fn on_adapter_state(&mut self, state: AdapterState) -> Result<()> {
        self.adapter_state = state;
        self.events.send(AgentEvent::AdapterState { state });

        if state.is_powered_on() {
            info!("Bluetooth adapter powered on");
            return Ok(());
        }

        warn!("Bluetooth adapter state is {}", state);
        for record in &self.armbands {
            if record.mark_disconnected().await {
                self.events.send(AgentEvent::Disconnected {
                    armband: record.id().clone(),
                    reason: DisconnectReason::AdapterPoweredOff,
                });
            }
        }
        Err(Error::adapter_unavailable(state))
    }

    /// Discover armbands on the first adapter until cancelled or the adapter
    /// becomes unavailable.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let adapter = get_adapter().await?;
        self.run_with_adapter(adapter, cancel).await
    }

    /// Discover armbands on `adapter` until cancelled or the adapter becomes
    /// unavailable. Armband tasks are cancelled and awaited before returning.
    #[tracing::instrument(level = "info", skip_all, fields(armbands = self.targets.len()))]
    pub async fn run_with_adapter(
        mut self,
        adapter: Adapter,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut adapter_events = adapter.events().await?;

        // Some backends report Unknown until the first StateUpdate arrives.
        let initial = AdapterState::from(adapter.adapter_state().await?);
        if initial == AdapterState::Unknown {
            debug!("Adapter state not yet known");
        } else {
            self.on_adapter_state(initial).await?;
        }

        adapter
            .start_scan(ScanFilter {
                services: vec![CONTROL_SERVICE],
            })
            .await?;
        info!(
            "Scanning for {}",
            self.targets
                .iter()
                .map(|t| t.address.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let sessions = cancel.child_token();
        let mut tasks = JoinSet::new();
        let mut identifiers: HashMap<PeripheralId, String> = HashMap::new();

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Discovery cancelled");
                    break Ok(());
                }
                event = adapter_events.next() => {
                    let Some(event) = event else {
                        break Err(Error::adapter_unavailable("event stream closed"));
                    };
                    match event {
                        CentralEvent::StateUpdate(state) => {
                            if let Err(e) = self.on_adapter_state(state.into()).await {
                                break Err(e);
                            }
                        }
                        CentralEvent::DeviceDisconnected(id) => {
                            let identifier = identifiers
                                .get(&id)
                                .cloned()
                                .unwrap_or_else(|| format_peripheral_id(&id));
                            self.on_peripheral_disconnected(&identifier).await;
                        }
                        event => {
                            let Some(id) = advertised_peripheral(&event) else {
                                continue;
                            };
                            // Updates from untracked devices are frequent; skip
                            // them without another adapter lookup
                            if identifiers
                                .get(id)
                                .is_some_and(|known| self.target_index(known).is_none())
                            {
                                continue;
                            }
                            let peripheral = match adapter.peripheral(id).await {
                                Ok(p) => p,
                                Err(e) => {
                                    debug!("Advertised peripheral vanished: {}", e);
                                    continue;
                                }
                            };
                            let identifier = match identifiers.get(id) {
                                Some(identifier) => identifier.clone(),
                                None => {
                                    let identifier = peripheral_identifier(&peripheral).await;
                                    identifiers.insert(id.clone(), identifier.clone());
                                    identifier
                                }
                            };

                            if let Some(record) = self.on_peripheral_discovered(&identifier).await {
                                tasks.spawn(serve_armband(
                                    adapter.clone(),
                                    peripheral,
                                    record,
                                    self.events.clone(),
                                    self.config.clone(),
                                    sessions.clone(),
                                ));
                            }
                        }
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Armband task failed: {}", e);
                    }
                }
            }
        };

        if let Err(e) = adapter.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }
        sessions.cancel();
        while tasks.join_next().await.is_some() {}

        result
    }
}

/// Peripheral behind an advertisement.
///
/// Backends report the first sighting as `DeviceDiscovered` and every later
/// advertisement as `DeviceUpdated`, so an armband coming back after a
/// disconnect only shows up as an update.
fn advertised_peripheral(event: &CentralEvent) -> Option<&PeripheralId> {
    match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => Some(id),
        _ => None,
    }
}

async fn peripheral_identifier(peripheral: &Peripheral) -> String {
    match peripheral.properties().await {
        Ok(Some(props)) => create_identifier(&props.address.to_string(), &peripheral.id()),
        _ => normalize_address(&format_peripheral_id(&peripheral.id())),
    }
}

/// Connect one armband and relay its data until it disconnects or the agent
/// stops.
#[tracing::instrument(level = "info", skip_all, fields(armband = %record.id()))]
async fn serve_armband(
    adapter: Adapter,
    peripheral: Peripheral,
    record: SharedRecord,
    events: EventDispatcher,
    config: AgentConfig,
    cancel: CancellationToken,
) {
    // Subscribe before connecting so no sample is missed.
    let receiver = events.subscribe();
    let session = tokio::select! {
        _ = cancel.cancelled() => {
            if record.mark_disconnected().await {
                events.send(AgentEvent::Disconnected {
                    armband: record.id().clone(),
                    reason: DisconnectReason::UserRequested,
                });
            }
            return;
        }
        result = ArmbandSession::connect(
            adapter,
            peripheral,
            Arc::clone(&record),
            events.clone(),
            config.connection.clone(),
        ) => match result {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to connect: {}", e);
                return;
            }
        },
    };

    if config.relay.enabled {
        match Relay::bind(record.id().clone(), RelayOptions::from(&config.relay)).await {
            Ok(relay) => match relay.run(&session, receiver, cancel.clone()).await {
                Ok(counters) => debug!(?counters, "Relay finished"),
                Err(e) => warn!("Relay stopped: {}", e),
            },
            Err(e) => error!("Failed to start relay: {}", e),
        }
    } else {
        drop(receiver);
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = session.wait_for_link_loss(LINK_POLL_INTERVAL) => {}
        }
    }

    // No-op for the event stream if the link was already lost.
    if let Err(e) = session.disconnect().await {
        debug!("Disconnect failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myo_types::ArmbandState;

    fn agent(addresses: &[&str], ports: &[u16], ips: &[&str]) -> DiscoveryAgent {
        let config = AgentConfig {
            n: addresses.len(),
            addresses: addresses.iter().map(|s| s.to_string()).collect(),
            ports: ports.to_vec(),
            ips: ips.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        DiscoveryAgent::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_assigns_port_and_ip_by_position() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        let mut rx = agent.subscribe();

        let record = agent.on_peripheral_discovered("aa").await.unwrap();
        assert_eq!(record.port(), 9000);
        assert_eq!(record.ip(), "127.0.0.1");
        assert_eq!(record.state().await, ArmbandState::Discovered);

        match rx.recv().await.unwrap() {
            AgentEvent::Discovered { armband } => assert_eq!(armband.port, 9000),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_armband_gets_second_destination() {
        let mut agent = agent(
            &["f01ccda72c85", "c82f3b010203"],
            &[15001, 15002],
            &["127.0.0.1", "10.0.0.5"],
        );
        let record = agent
            .on_peripheral_discovered("C8:2F:3B:01:02:03")
            .await
            .unwrap();
        assert_eq!(record.port(), 15002);
        assert_eq!(record.ip(), "10.0.0.5");
        assert_eq!(agent.target_index("f0:1c:cd:a7:2c:85"), Some(0));
    }

    #[tokio::test]
    async fn test_unconfigured_peripheral_ignored() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        let mut rx = agent.subscribe();
        assert!(agent.on_peripheral_discovered("bb").await.is_none());
        assert!(agent.armbands().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_discovery_event_once_per_peripheral() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        let mut rx = agent.subscribe();

        assert!(agent.on_peripheral_discovered("aa").await.is_some());
        assert!(agent.on_peripheral_discovered("aa").await.is_none());
        assert_eq!(agent.armbands().len(), 1);

        assert!(matches!(rx.try_recv(), Ok(AgentEvent::Discovered { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rediscovery_after_disconnect_creates_new_record() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        let first = agent.on_peripheral_discovered("aa").await.unwrap();
        let lost = agent.on_peripheral_disconnected("aa").await.unwrap();
        assert!(Arc::ptr_eq(&first, &lost));
        assert!(first.is_disconnected().await);

        let second = agent.on_peripheral_discovered("aa").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(agent.armbands().len(), 2);
        assert!(first.is_disconnected().await);
    }

    #[test]
    fn test_only_advertisements_name_a_peripheral() {
        use btleplug::api::CentralState;

        let event = CentralEvent::StateUpdate(CentralState::PoweredOn);
        assert!(advertised_peripheral(&event).is_none());
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_updated_advertisement_is_rediscovery() {
        let id = PeripheralId::from(::uuid::Uuid::from_u128(0x6e4f));

        for event in [
            CentralEvent::DeviceDiscovered(id.clone()),
            CentralEvent::DeviceUpdated(id.clone()),
        ] {
            assert_eq!(advertised_peripheral(&event), Some(&id));
        }
        let event = CentralEvent::DeviceDisconnected(id.clone());
        assert!(advertised_peripheral(&event).is_none());
    }

    #[tokio::test]
    async fn test_repeated_advertisements_while_live_are_ignored() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        let mut rx = agent.subscribe();
        let record = agent.on_peripheral_discovered("aa").await.unwrap();
        record.set_state(ArmbandState::Ready).await;

        for _ in 0..5 {
            assert!(agent.on_peripheral_discovered("aa").await.is_none());
        }
        assert_eq!(agent.armbands().len(), 1);
        assert!(matches!(rx.try_recv(), Ok(AgentEvent::Discovered { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_of_unknown_peripheral() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        assert!(agent.on_peripheral_disconnected("aa").await.is_none());
    }

    #[tokio::test]
    async fn test_adapter_power_off_disconnects_everything() {
        let mut agent = agent(&["aa", "bb"], &[9000, 9001], &["127.0.0.1", "127.0.0.1"]);
        let a = agent.on_peripheral_discovered("aa").await.unwrap();
        let b = agent.on_peripheral_discovered("bb").await.unwrap();
        a.set_state(ArmbandState::Ready).await;
        b.set_state(ArmbandState::Connecting).await;
        let mut rx = agent.subscribe();

        let err = agent
            .on_adapter_state(AdapterState::PoweredOff)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AdapterUnavailable { .. }));
        assert_eq!(agent.adapter_state(), AdapterState::PoweredOff);

        for record in agent.armbands() {
            assert!(!record.is_connected().await);
            assert_eq!(record.state().await, ArmbandState::Disconnected);
        }

        assert!(matches!(
            rx.try_recv(),
            Ok(AgentEvent::AdapterState {
                state: AdapterState::PoweredOff
            })
        ));
        let mut reasons = Vec::new();
        while let Ok(AgentEvent::Disconnected { reason, .. }) = rx.try_recv() {
            reasons.push(reason);
        }
        assert_eq!(reasons, vec![DisconnectReason::AdapterPoweredOff; 2]);
    }

    #[tokio::test]
    async fn test_adapter_powered_on_is_ok() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        agent.on_adapter_state(AdapterState::PoweredOn).await.unwrap();
        assert!(agent.adapter_state().is_powered_on());
    }

    #[tokio::test]
    async fn test_snapshot() {
        let mut agent = agent(&["aa"], &[9000], &["127.0.0.1"]);
        agent.on_peripheral_discovered("aa").await;
        let snapshot = agent.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].state, ArmbandState::Discovered);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AgentConfig {
            n: 2,
            ..Default::default()
        };
        assert!(matches!(
            DiscoveryAgent::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
