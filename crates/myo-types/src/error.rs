//! Error types for data parsing in myo-types.

use thiserror::Error;

/// Errors that can occur when parsing armband data or console resources.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in myo-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Failed to parse data for a reason other than its length.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A packet had the wrong number of bytes.
    #[error("Packet requires {expected} bytes, got {actual}")]
    InsufficientBytes {
        /// Number of bytes the packet format requires.
        expected: usize,
        /// Number of bytes received.
        actual: usize,
    },

    /// A field carried a value outside its valid range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The gallery resource could not be read.
    #[error("Gallery line {line}: {message}")]
    Gallery {
        /// 1-based line number in the source file (0 when unknown).
        line: u64,
        /// Description of the problem.
        message: String,
    },
}

/// Result type alias using myo-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
