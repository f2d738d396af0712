//! Agent configuration.
//!
//! The agent tracks `n` armbands. Each one is described by a position in three
//! parallel lists: hardware address, destination UDP port and destination host.
//! An omitted list falls back to a single default entry; after that every list
//! must hold exactly `n` entries.
//!
//! ```
//! use myo_core::AgentConfig;
//!
//! let config = AgentConfig::default();
//! let targets = config.targets().unwrap();
//! assert_eq!(targets.len(), 1);
//! assert_eq!(targets[0].port, 15001);
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use myo_types::normalize_address;

use crate::error::{Error, Result};
use crate::events::ArmbandId;

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "f01ccda72c85";
/// Destination port used when none is configured.
pub const DEFAULT_PORT: u16 = 15001;
/// Destination host used when none is configured.
pub const DEFAULT_IP: &str = "127.0.0.1";

/// Complete agent configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Number of armbands to track.
    pub n: usize,
    /// Armband hardware addresses. Empty means the default address.
    pub addresses: Vec<String>,
    /// Destination UDP ports, one per armband. Empty means the default port.
    pub ports: Vec<u16>,
    /// Destination hosts, one per armband. Empty means loopback.
    pub ips: Vec<String>,
    /// Debug level: 0 normal, 1 debug, 2 per-sample logging.
    pub debug: u8,
    /// BLE connection settings.
    pub connection: ConnectionConfig,
    /// UDP relay settings.
    pub relay: RelayConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            n: 1,
            addresses: Vec::new(),
            ports: Vec::new(),
            ips: Vec::new(),
            debug: 0,
            connection: ConnectionConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

/// BLE timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub connect_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            discovery_timeout_secs: 10,
            read_timeout_secs: 10,
            write_timeout_secs: 10,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

/// UDP relay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Whether raw samples are forwarded over UDP.
    pub enabled: bool,
    /// Seconds between rate log lines.
    pub rate_interval_secs: u64,
    /// Offset added to the destination port for the local vibrate socket.
    pub vibrate_port_offset: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_interval_secs: 2,
            vibrate_port_offset: 1000,
        }
    }
}

impl RelayConfig {
    pub fn rate_interval(&self) -> Duration {
        Duration::from_secs(self.rate_interval_secs)
    }
}

/// One configured armband with its relay destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmbandTarget {
    /// Normalized hardware address.
    pub address: String,
    pub port: u16,
    pub ip: String,
}

impl ArmbandTarget {
    pub fn new(address: &str, port: u16, ip: impl Into<String>) -> Self {
        Self {
            address: normalize_address(address),
            port,
            ip: ip.into(),
        }
    }

    pub fn id(&self) -> ArmbandId {
        ArmbandId::new(self.address.clone(), self.port, self.ip.clone())
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Check the configuration without building targets.
    pub fn validate(&self) -> Result<()> {
        self.targets().map(|_| ())
    }

    /// Apply defaults and the length policy, producing one target per armband.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `n` or the rate interval is zero,
    /// if any list does not hold exactly `n` entries, or if an entry is
    /// unusable.
    pub fn targets(&self) -> Result<Vec<ArmbandTarget>> {
        if self.n == 0 {
            return Err(Error::invalid_config("n must be at least 1"));
        }
        if self.relay.rate_interval_secs == 0 {
            return Err(Error::invalid_config(
                "relay.rate_interval_secs must be at least 1",
            ));
        }

        let addresses = or_default(&self.addresses, DEFAULT_ADDRESS.to_string());
        let ports = or_default(&self.ports, DEFAULT_PORT);
        let ips = or_default(&self.ips, DEFAULT_IP.to_string());

        check_len("addresses", addresses.len(), self.n)?;
        check_len("ports", ports.len(), self.n)?;
        check_len("ips", ips.len(), self.n)?;

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(self.n);
        for ((address, port), ip) in addresses.iter().zip(&ports).zip(&ips) {
            let target = ArmbandTarget::new(address, *port, ip.trim());
            if target.address.is_empty() {
                return Err(Error::invalid_config("armband address cannot be empty"));
            }
            if !seen.insert(target.address.clone()) {
                return Err(Error::invalid_config(format!(
                    "duplicate armband address '{}'",
                    address
                )));
            }
            if target.port == 0 {
                return Err(Error::invalid_config(format!(
                    "port for armband '{}' cannot be 0",
                    address
                )));
            }
            if self.relay.enabled
                && target
                    .port
                    .checked_add(self.relay.vibrate_port_offset)
                    .is_none()
            {
                return Err(Error::invalid_config(format!(
                    "port {} plus vibrate offset {} exceeds 65535",
                    target.port, self.relay.vibrate_port_offset
                )));
            }
            if target.ip.is_empty() {
                return Err(Error::invalid_config(format!(
                    "ip for armband '{}' cannot be empty",
                    address
                )));
            }
            targets.push(target);
        }

        Ok(targets)
    }
}

fn or_default<T: Clone>(list: &[T], default: T) -> Vec<T> {
    if list.is_empty() {
        vec![default]
    } else {
        list.to_vec()
    }
}

fn check_len(name: &str, len: usize, n: usize) -> Result<()> {
    if len != n {
        return Err(Error::invalid_config(format!(
            "{} has {} entries but n is {}",
            name, len, n
        )));
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Targets are produced only when every list matches `n`, and never
        /// more than `n` of them.
        #[test]
        fn length_policy(n in 1usize..5, na in 0usize..5, np in 0usize..5, ni in 0usize..5) {
            let config = AgentConfig {
                n,
                addresses: (0..na).map(|i| format!("a{i}")).collect(),
                ports: (0..np).map(|i| 9000 + i as u16).collect(),
                ips: (0..ni).map(|_| "127.0.0.1".to_string()).collect(),
                ..Default::default()
            };
            let effective = |len: usize| if len == 0 { 1 } else { len };
            let ok = effective(na) == n && effective(np) == n && effective(ni) == n;
            match config.targets() {
                Ok(targets) => {
                    prop_assert!(ok);
                    prop_assert_eq!(targets.len(), n);
                }
                Err(Error::InvalidConfig(_)) => prop_assert!(!ok),
                Err(e) => prop_assert!(false, "unexpected error: {e}"),
            }
        }
    }
}
