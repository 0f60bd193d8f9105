//! Error handling for zwlink
//!
//! Provides the error types for all layers of the link:
//! - Link errors (framing, handshake, reply and transport failures)
//! - Configuration errors (loading and validating link settings)
//!
//! Transient conditions (handshake timeouts and rejections, stray bytes,
//! checksum mismatches on inbound frames) never surface here: they are
//! absorbed by the transaction engine and only counted. What remains are
//! the conditions a caller has to decide about.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Link error type
///
/// Represents failures of the serial link protocol engine that survived
/// its bounded local retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The peer never acknowledged the frame
    #[error("No acknowledgement after {attempts} transmissions")]
    NoAcknowledgement {
        /// Number of times the frame was written to the link.
        attempts: u32,
    },

    /// The frame was acknowledged but no reply frame followed
    #[error("No reply within {timeout_ms}ms")]
    NoReply {
        /// The reply timeout in milliseconds.
        timeout_ms: u64,
    },

    /// A byte did not arrive in time while receiving a frame
    #[error("Link read timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Payload does not fit the one-byte length field
    #[error("Payload of {len} bytes exceeds the maximum of {max}")]
    PayloadTooLarge {
        /// The payload length.
        len: usize,
        /// The largest accepted payload length.
        max: usize,
    },

    /// Inbound frame too short to carry a kind and a checksum
    #[error("Frame length {len} too short")]
    FrameTooShort {
        /// The received length byte.
        len: u8,
    },

    /// The byte source could not be opened
    #[error("Transport unavailable on {port}: {reason}")]
    TransportUnavailable {
        /// The port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Reading or writing the byte source failed
    #[error("Link I/O error: {reason}")]
    Io {
        /// The reason for the I/O error.
        reason: String,
    },
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Io {
            reason: err.to_string(),
        }
    }
}

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is invalid
    #[error("Invalid setting '{key}': {reason}")]
    Invalid {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file format is not supported
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The configuration file could not be parsed or serialized
    #[error("Malformed configuration: {0}")]
    Parse(String),

    /// The configuration directory could not be found
    #[error("Config directory error: {0}")]
    ConfigDirectory(String),
}

/// Main error type for zwlink
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Link error
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout of any kind
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Link(LinkError::Timeout { .. })
                | Error::Link(LinkError::NoReply { .. })
                | Error::Link(LinkError::NoAcknowledgement { .. })
        )
    }

    /// Check if this is a link error
    pub fn is_link_error(&self) -> bool {
        matches!(self, Error::Link(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Whether re-issuing the whole transaction could succeed.
    ///
    /// Missing acknowledgements and replies are transient; a port that
    /// cannot be opened or an oversize payload is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Link(
                LinkError::NoAcknowledgement { .. }
                    | LinkError::NoReply { .. }
                    | LinkError::Timeout { .. }
                    | LinkError::FrameTooShort { .. }
            )
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
