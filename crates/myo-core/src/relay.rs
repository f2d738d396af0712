//! UDP relay of raw armband data.
//!
//! Each ready armband gets a [`Relay`] that republishes its raw notification
//! bytes (16-byte EMG, 20-byte IMU, 1-byte battery) as datagrams to the
//! armband's assigned `ip:port`. The relay also listens on a local socket for
//! vibration requests: a single byte `0..=3` is the vibration duration.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::MAX_VIBRATION;
use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::events::{AgentEvent, ArmbandId, EventReceiver};
use crate::traits::Armband;

/// EMG samples carried by one notification.
const SAMPLES_PER_EMG_PACKET: u64 = 2;

/// Relay settings.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// How often the rate line is logged.
    pub rate_interval: Duration,
    /// Added to the destination port to get the vibrate listener port.
    pub vibrate_port_offset: u16,
    /// Explicit vibrate listener address, overriding the offset.
    pub vibrate_bind: Option<SocketAddr>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for RelayOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            rate_interval: config.rate_interval(),
            vibrate_port_offset: config.vibrate_port_offset,
            vibrate_bind: None,
        }
    }
}

impl RelayOptions {
    #[must_use]
    pub fn rate_interval(mut self, interval: Duration) -> Self {
        self.rate_interval = interval;
        self
    }

    #[must_use]
    pub fn vibrate_bind(mut self, addr: SocketAddr) -> Self {
        self.vibrate_bind = Some(addr);
        self
    }
}

/// Running totals of relayed data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCounters {
    /// EMG samples (two per notification).
    pub emg_samples: u64,
    pub imu_samples: u64,
    pub battery_events: u64,
}

/// Rates over one reporting interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateReport {
    pub emg_hz: f64,
    pub imu_hz: f64,
    /// Total battery events so far.
    pub battery_events: u64,
}

impl fmt::Display for RateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EMG: {:.1} Hz IMU: {:.1} Hz BattEvts: {}",
            self.emg_hz, self.imu_hz, self.battery_events
        )
    }
}

/// Turns counter snapshots into per-interval rates.
#[derive(Debug, Clone)]
pub struct RateTracker {
    started: Instant,
    last: RelayCounters,
}

impl RateTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            last: RelayCounters::default(),
        }
    }

    /// Rates since the previous report, then restart the interval.
    pub fn report(&mut self, now: Instant, counters: RelayCounters) -> RateReport {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let rate = |current: u64, last: u64| {
            if elapsed > 0.0 {
                current.saturating_sub(last) as f64 / elapsed
            } else {
                0.0
            }
        };
        let report = RateReport {
            emg_hz: rate(counters.emg_samples, self.last.emg_samples),
            imu_hz: rate(counters.imu_samples, self.last.imu_samples),
            battery_events: counters.battery_events,
        };
        self.started = now;
        self.last = counters;
        report
    }
}

/// Parse a vibrate request datagram.
pub fn parse_vibrate_request(data: &[u8]) -> Option<u8> {
    match data {
        [duration] if *duration <= MAX_VIBRATION => Some(*duration),
        _ => None,
    }
}

/// UDP relay for one armband.
#[derive(Debug)]
pub struct Relay {
    armband: ArmbandId,
    socket: UdpSocket,
    destination: SocketAddr,
    vibrate: UdpSocket,
    counters: RelayCounters,
    options: RelayOptions,
}

impl Relay {
    /// Resolve the destination and bind the outbound and vibrate sockets.
    #[tracing::instrument(level = "debug", skip_all, fields(armband = %armband))]
    pub async fn bind(armband: ArmbandId, options: RelayOptions) -> Result<Self> {
        if options.rate_interval.is_zero() {
            return Err(Error::invalid_config("relay rate interval must be non-zero"));
        }

        let destination = lookup_host((armband.ip.as_str(), armband.port))
            .await?
            .next()
            .ok_or_else(|| {
                Error::invalid_config(format!("cannot resolve relay host '{}'", armband.ip))
            })?;

        let local: SocketAddr = if destination.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;

        let vibrate_addr = match options.vibrate_bind {
            Some(addr) => addr,
            None => {
                let port = armband
                    .port
                    .checked_add(options.vibrate_port_offset)
                    .ok_or_else(|| {
                        Error::invalid_config(format!(
                            "port {} plus vibrate offset {} exceeds 65535",
                            armband.port, options.vibrate_port_offset
                        ))
                    })?;
                (Ipv4Addr::LOCALHOST, port).into()
            }
        };
        let vibrate = UdpSocket::bind(vibrate_addr).await?;

        info!(
            "Relaying to {} (vibrate requests on {})",
            destination,
            vibrate.local_addr()?
        );

        Ok(Self {
            armband,
            socket,
            destination,
            vibrate,
            counters: RelayCounters::default(),
            options,
        })
    }

    pub fn armband(&self) -> &ArmbandId {
        &self.armband
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Local address of the vibrate listener.
    pub fn vibrate_addr(&self) -> Result<SocketAddr> {
        Ok(self.vibrate.local_addr()?)
    }

    pub fn counters(&self) -> RelayCounters {
        self.counters
    }

    /// Send the raw bytes of a data event belonging to this armband.
    ///
    /// Returns `true` if a datagram was sent.
    pub async fn forward(&mut self, event: &AgentEvent) -> Result<bool> {
        if event.armband() != Some(&self.armband) {
            return Ok(false);
        }
        match event {
            AgentEvent::Emg { raw, .. } => {
                self.socket.send_to(raw, self.destination).await?;
                self.counters.emg_samples += SAMPLES_PER_EMG_PACKET;
            }
            AgentEvent::Imu { raw, .. } => {
                self.socket.send_to(raw, self.destination).await?;
                self.counters.imu_samples += 1;
            }
            AgentEvent::Battery { level, .. } => {
                self.socket.send_to(&[*level], self.destination).await?;
                self.counters.battery_events += 1;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Relay until cancelled, the event stream closes, or this armband
    /// disconnects.
    pub async fn run<A: Armband + ?Sized>(
        mut self,
        armband: &A,
        mut events: EventReceiver,
        cancel: CancellationToken,
    ) -> Result<RelayCounters> {
        let mut ticker = tokio::time::interval(self.options.rate_interval);
        ticker.tick().await;
        let mut rates = RateTracker::new(Instant::now());
        let mut buf = [0u8; 64];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(armband = %self.armband.address, "Relay cancelled");
                    break;
                }
                received = events.recv() => match received {
                    Ok(AgentEvent::Disconnected { armband, .. }) if armband == self.armband => {
                        info!(armband = %self.armband.address, "Armband disconnected, stopping relay");
                        break;
                    }
                    Ok(event) => {
                        if let Err(e) = self.forward(&event).await {
                            warn!(armband = %self.armband.address, "Relay send failed: {}", e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(armband = %self.armband.address, skipped, "Relay lagging, samples dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ticker.tick() => {
                    let report = rates.report(Instant::now(), self.counters);
                    info!(armband = %self.armband.address, "{}", report);
                }
                received = self.vibrate.recv_from(&mut buf) => match received {
                    Ok((len, from)) => match parse_vibrate_request(&buf[..len]) {
                        Some(duration) => {
                            debug!(%from, duration, "Vibrate request");
                            if let Err(e) = armband.vibrate(duration).await {
                                warn!(armband = %self.armband.address, "Vibrate failed: {}", e);
                            }
                        }
                        None => debug!(%from, len, "Ignoring malformed vibrate request"),
                    },
                    Err(e) => warn!("Vibrate socket error: {}", e),
                },
            }
        }

        Ok(self.counters)
    }
}
