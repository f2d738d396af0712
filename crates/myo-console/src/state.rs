//! Application state shared across handlers.
//!
//! # Channels
//!
//! Two broadcast channels connect the WebSocket clients to the controller
//! link:
//!
//! - **`status_tx`** carries every status frame received from the controller
//!   to all connected consoles. The buffer size is `server.broadcast_buffer`
//!   (default: 100); a console that falls behind loses the oldest frames.
//! - **`commands_tx`** carries decoded console commands to the controller
//!   link. Commands submitted while no link is attached are dropped.
//!
//! # Console Mirror
//!
//! Status frames with a registered tag are also applied to an in-memory
//! [`ConsoleState`], and the latest frame for each tag is kept so a console
//! that connects late can be brought up to date by replaying them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use myo_types::message::{self, UnrecognizedTag};
use myo_types::status::JointField;
use myo_types::{CommandTag, ConsoleState, Gallery, Message, StatusTag};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// Configuration (RwLock for runtime updates).
    pub config: RwLock<Config>,
    /// Motion class gallery served to the console.
    pub gallery: Gallery,
    /// Broadcast channel for status frames going to consoles.
    pub status_tx: broadcast::Sender<String>,
    /// Broadcast channel for commands going to the controller.
    pub commands_tx: broadcast::Sender<Message>,
    /// Mirror of what every console currently shows.
    mirror: RwLock<Mirror>,
    /// Message counters.
    pub stats: ConsoleStats,
}

#[derive(Default)]
struct Mirror {
    view: ConsoleState,
    /// Latest raw frame per registered tag, oldest first.
    frames: Vec<MirroredFrame>,
}

struct MirroredFrame {
    tag: StatusTag,
    raw: String,
    /// Joint error frame in effect when a target frame was applied. Target
    /// placement reads the marker width the error frame set.
    width_from: Option<(StatusTag, String)>,
}

impl Mirror {
    fn record(&mut self, tag: StatusTag, raw: &str) {
        let width_from = match tag {
            StatusTag::TacJoint {
                joint,
                field: JointField::Target,
            } => {
                let error = StatusTag::TacJoint {
                    joint,
                    field: JointField::Error,
                };
                self.frames
                    .iter()
                    .find(|f| f.tag == error)
                    .map(|f| (error, f.raw.clone()))
            }
            _ => None,
        };
        self.frames.retain(|f| f.tag != tag);
        self.frames.push(MirroredFrame {
            tag,
            raw: raw.to_string(),
            width_from,
        });
    }

    fn replay(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.frames.len());
        // Error frame most recently emitted per joint
        let mut widths: HashMap<StatusTag, &str> = HashMap::new();
        for frame in &self.frames {
            if let Some((error_tag, error)) = &frame.width_from {
                if widths.get(error_tag) != Some(&error.as_str()) {
                    out.push(error.clone());
                    widths.insert(*error_tag, error);
                }
            }
            if let StatusTag::TacJoint {
                field: JointField::Error,
                ..
            } = frame.tag
            {
                widths.insert(frame.tag, &frame.raw);
            }
            out.push(frame.raw.clone());
        }
        out
    }
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Config, gallery: Gallery) -> Arc<Self> {
        let buffer_size = config.server.broadcast_buffer.max(1);
        let (status_tx, _) = broadcast::channel(buffer_size);
        let (commands_tx, _) = broadcast::channel(buffer_size);
        Arc::new(Self {
            config: RwLock::new(config),
            gallery,
            status_tx,
            commands_tx,
            mirror: RwLock::new(Mirror::default()),
            stats: ConsoleStats::default(),
        })
    }

    /// Apply a status frame from the controller and forward it to consoles.
    ///
    /// Every frame is broadcast. Only frames with a registered tag update the
    /// mirror; returns whether the mirror changed.
    pub async fn apply_status(&self, raw: &str) -> bool {
        let msg = message::decode(raw);
        let applied = match StatusTag::from_tag(msg.tag()) {
            Some(tag) => {
                let mut mirror = self.mirror.write().await;
                let applied = tag.apply(&mut mirror.view, msg.payload());
                if applied {
                    mirror.record(tag, raw);
                }
                applied
            }
            None => {
                debug!("Status tag '{}' is not mirrored", msg.tag());
                false
            }
        };

        if applied {
            self.stats.status_applied.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.status_ignored.fetch_add(1, Ordering::Relaxed);
        }

        // No connected consoles is fine
        let _ = self.status_tx.send(raw.to_string());
        applied
    }

    /// Frames that rebuild the current mirror, in the order they were last applied.
    ///
    /// A joint target frame is preceded by the error frame whose width it was
    /// laid out against.
    pub async fn replay(&self) -> Vec<String> {
        self.mirror.read().await.replay()
    }

    /// Snapshot of the console mirror.
    pub async fn snapshot(&self) -> ConsoleState {
        self.mirror.read().await.view.clone()
    }

    /// Decode a console frame and queue it for the controller.
    ///
    /// Frames whose tag is not a command tag are rejected.
    pub fn submit_command(&self, raw: &str) -> Result<CommandTag, UnrecognizedTag> {
        let msg = message::decode(raw);
        let tag = match msg.command_tag() {
            Some(tag) => tag,
            None => {
                self.stats.commands_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping console frame with unknown tag '{}'", msg.tag());
                return Err(UnrecognizedTag(msg.tag().to_string()));
            }
        };

        debug!("Console command {}", msg);
        if self.commands_tx.send(msg).is_err() {
            warn!("No controller link attached, {} command dropped", tag);
        }
        self.stats.commands_submitted.fetch_add(1, Ordering::Relaxed);
        Ok(tag)
    }
}

/// Message counters, readable without locking.
#[derive(Debug, Default)]
pub struct ConsoleStats {
    pub commands_submitted: AtomicU64,
    pub commands_rejected: AtomicU64,
    pub status_applied: AtomicU64,
    pub status_ignored: AtomicU64,
}

impl ConsoleStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commands_submitted: self.commands_submitted.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            status_applied: self.status_applied.load(Ordering::Relaxed),
            status_ignored: self.status_ignored.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ConsoleStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub commands_submitted: u64,
    pub commands_rejected: u64,
    pub status_applied: u64,
    pub status_ignored: u64,
}
