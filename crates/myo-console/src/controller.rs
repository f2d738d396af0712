//! UDP link to the controller.
//!
//! Console commands are sent to `controller.command_addr`, one frame per
//! datagram. Status frames arrive on `controller.status_bind`; each one is
//! applied to the console mirror and broadcast to connected consoles.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use myo_types::Message;
use tokio::net::UdpSocket;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::state::AppState;

/// Largest status datagram accepted.
const MAX_DATAGRAM: usize = 2048;

/// Controller link errors.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Invalid {field} '{value}'")]
    Address { field: &'static str, value: String },
    #[error("Controller socket error: {0}")]
    Io(#[from] io::Error),
}

/// Bidirectional UDP link between the console backend and the controller.
pub struct ControllerLink {
    state: Arc<AppState>,
    socket: UdpSocket,
    command_addr: SocketAddr,
    commands: broadcast::Receiver<Message>,
}

impl ControllerLink {
    /// Bind the status socket described by the configuration.
    ///
    /// Commands leave from the same socket, so a controller can also reply to
    /// the command source address.
    pub async fn bind(state: Arc<AppState>, config: &ControllerConfig) -> Result<Self, LinkError> {
        let command_addr = parse_addr("controller.command_addr", &config.command_addr)?;
        let status_bind = parse_addr("controller.status_bind", &config.status_bind)?;

        let socket = UdpSocket::bind(status_bind).await?;
        info!(
            "Controller link listening on {}, sending to {}",
            socket.local_addr()?,
            command_addr
        );

        // Subscribe now so commands submitted before the link runs are kept
        let commands = state.commands_tx.subscribe();
        Ok(Self {
            state,
            socket,
            command_addr,
            commands,
        })
    }

    /// Address status frames are received on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Where commands are sent.
    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    /// Spawn the link on the runtime.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Forward commands and receive status until the command channel closes.
    pub async fn run(mut self) {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Ok(msg) => {
                        let frame = msg.encode();
                        if let Err(e) = self.socket.send_to(frame.as_bytes(), self.command_addr).await {
                            warn!("Failed to send '{}' to controller: {}", frame, e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Controller link lagged, {} commands dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => {
                        let Some(frame) = status_frame(&buf[..len]) else {
                            debug!("Ignoring non-text datagram from {}", from);
                            continue;
                        };
                        self.state.apply_status(frame).await;
                    }
                    Err(e) => warn!("Status receive error: {}", e),
                },
            }
        }

        info!("Controller link stopped");
    }
}

/// Decode a status datagram. Trailing line endings are not part of the frame.
fn status_frame(datagram: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(datagram).ok()?;
    let text = text.trim_end_matches(['\r', '\n']);
    (!text.is_empty()).then_some(text)
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, LinkError> {
    value.parse().map_err(|_| LinkError::Address {
        field,
        value: value.to_string(),
    })
}
