//! Tracked armband records.
//!
//! A record is created when a configured armband is discovered and is shared
//! between the discovery loop, the armband session and the relay. Its state
//! only moves forward; once disconnected a record stays disconnected and a
//! later rediscovery creates a fresh one.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use myo_types::{ArmbandService, ArmbandState};

use crate::events::ArmbandId;

/// Shared handle to a record.
pub type SharedRecord = Arc<ArmbandRecord>;

/// One discovered armband and its relay destination.
#[derive(Debug)]
pub struct ArmbandRecord {
    id: ArmbandId,
    inner: RwLock<RecordInner>,
}

#[derive(Debug, Default)]
struct RecordInner {
    state: ArmbandState,
    services: BTreeSet<ArmbandService>,
}

/// Point-in-time copy of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub armband: ArmbandId,
    pub state: ArmbandState,
    pub services: Vec<ArmbandService>,
}

impl ArmbandRecord {
    /// Create a record in the `Discovered` state.
    pub fn new(id: ArmbandId) -> Self {
        Self {
            id,
            inner: RwLock::new(RecordInner::default()),
        }
    }

    pub fn shared(id: ArmbandId) -> SharedRecord {
        Arc::new(Self::new(id))
    }

    pub fn id(&self) -> &ArmbandId {
        &self.id
    }

    pub fn address(&self) -> &str {
        &self.id.address
    }

    pub fn port(&self) -> u16 {
        self.id.port
    }

    pub fn ip(&self) -> &str {
        &self.id.ip
    }

    pub async fn state(&self) -> ArmbandState {
        self.inner.read().await.state
    }

    /// Move to `state`. Returns `false` and leaves the record unchanged if it
    /// is already disconnected.
    pub async fn set_state(&self, state: ArmbandState) -> bool {
        let mut inner = self.inner.write().await;
        if inner.state == ArmbandState::Disconnected {
            return false;
        }
        inner.state = state;
        true
    }

    /// Mark the record disconnected. Returns `true` if it was not already.
    pub async fn mark_disconnected(&self) -> bool {
        let mut inner = self.inner.write().await;
        let changed = inner.state != ArmbandState::Disconnected;
        inner.state = ArmbandState::Disconnected;
        changed
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await.is_connected()
    }

    pub async fn is_disconnected(&self) -> bool {
        self.state().await == ArmbandState::Disconnected
    }

    /// Record that notifications for `service` are enabled.
    pub async fn mark_service_enabled(&self, service: ArmbandService) {
        self.inner.write().await.services.insert(service);
    }

    /// Enabled services in stable order.
    pub async fn services(&self) -> Vec<ArmbandService> {
        self.inner.read().await.services.iter().copied().collect()
    }

    pub async fn snapshot(&self) -> RecordSnapshot {
        let inner = self.inner.read().await;
        RecordSnapshot {
            armband: self.id.clone(),
            state: inner.state,
            services: inner.services.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArmbandRecord {
        ArmbandRecord::new(ArmbandId::new("aa", 9000, "127.0.0.1"))
    }

    #[tokio::test]
    async fn test_new_record() {
        let record = record();
        assert_eq!(record.state().await, ArmbandState::Discovered);
        assert!(!record.is_connected().await);
        assert_eq!(record.address(), "aa");
        assert_eq!(record.port(), 9000);
        assert_eq!(record.ip(), "127.0.0.1");
        assert!(record.services().await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_is_terminal() {
        let record = record();
        assert!(record.set_state(ArmbandState::Ready).await);
        assert!(record.is_connected().await);

        assert!(record.mark_disconnected().await);
        assert!(!record.mark_disconnected().await);
        assert!(!record.set_state(ArmbandState::Ready).await);
        assert!(record.is_disconnected().await);
    }

    #[tokio::test]
    async fn test_services_ordered_and_unique() {
        let record = record();
        record.mark_service_enabled(ArmbandService::Imu).await;
        record.mark_service_enabled(ArmbandService::Battery).await;
        record.mark_service_enabled(ArmbandService::Imu).await;
        assert_eq!(
            record.services().await,
            vec![ArmbandService::Battery, ArmbandService::Imu]
        );

        let snapshot = record.snapshot().await;
        assert_eq!(snapshot.services.len(), 2);
        assert_eq!(snapshot.armband.port, 9000);
    }
}
