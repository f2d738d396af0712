//! Error types for myo-core.
//!
//! Discovery has no retry or timeout policy of its own: adapter failures are
//! fatal and surface to the caller, while per-armband failures end only that
//! armband's session.
//!
//! | Error | Raised by | Effect |
//! |-------|-----------|--------|
//! | [`Error::AdapterUnavailable`] | adapter leaves the powered-on state | discovery stops |
//! | [`Error::NoAdapter`] | no adapter present | discovery never starts |
//! | [`Error::Timeout`] | connect / service discovery / read / write | session ends |
//! | [`Error::CharacteristicNotFound`] | not a Myo, or unsupported firmware | session ends |
//! | [`Error::InvalidConfig`] | startup validation | process exits |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while discovering, streaming from, or relaying
/// Myo armbands.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The adapter left the powered-on state.
    #[error("Bluetooth adapter not available (state: {state})")]
    AdapterUnavailable {
        /// The state the adapter reported.
        state: String,
    },

    /// No Bluetooth adapter is available.
    #[error("No Bluetooth adapter available")]
    NoAdapter,

    /// Operation attempted while not connected to the armband.
    #[error("Not connected to armband")]
    NotConnected,

    /// Required BLE characteristic not found on the armband.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Failed to parse data received from the armband.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// I/O error (UDP sockets, config files).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read or parsed.
    #[error("Failed to load config {path}: {message}")]
    ConfigFile {
        /// Path of the file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

impl Error {
    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an adapter unavailable error.
    pub fn adapter_unavailable(state: impl std::fmt::Display) -> Self {
        Self::AdapterUnavailable {
            state: state.to_string(),
        }
    }
}

impl From<myo_types::ParseError> for Error {
    fn from(err: myo_types::ParseError) -> Self {
        match err {
            myo_types::ParseError::InsufficientBytes { expected, actual } => Error::InvalidData(
                format!("expected {} bytes, got {}", expected, actual),
            ),
            myo_types::ParseError::InvalidValue(msg) | myo_types::ParseError::InvalidData(msg) => {
                Error::InvalidData(msg)
            }
            // Handle future ParseError variants (non_exhaustive)
            _ => Error::InvalidData(format!("Parse error: {}", err)),
        }
    }
}

/// Result type alias using myo-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
