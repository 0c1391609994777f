//! Error types for the secure frame channel and its cryptography layer
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are a single
//! tagged enum so callers decide fallback behavior with a `match` on the variant
//! (or on [`FrameError::category`]) rather than on type identity.
//!
//! Two layers produce errors:
//! - the cryptography layer (`UnsupportedEncoding`, `Decoding`, `Key`,
//!   `Encryption`, `Decryption`, `Validation`)
//! - the channel layer (`HandshakeTimeout`, `HandshakeVersionMismatch`,
//!   `ChannelClosed`, `ChannelNotTrusted`, `UnknownEvent`, `ActionTimeout`)
//!
//! Inbound messages that fail origin, schema or payload checks are never turned
//! into errors; the channel drops them.

use crate::types::ChannelState;
use std::time::Duration;

/// Boxed source error carried by cryptographic failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors produced by the channel and cryptography layers
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Requested byte encoding is not one of hex, base58 or base64
    #[error("Unsupported encoding: {encoding}")]
    UnsupportedEncoding { encoding: String },

    /// Input string is not valid for the requested encoding
    #[error("Decoding failed: {message}")]
    Decoding { message: String },

    /// Malformed, invalid or degenerate key material
    #[error("Key error: {message}")]
    Key {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Sealing a payload failed
    #[error("Encryption failed: {message}")]
    Encryption {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Opening a payload failed (tag mismatch, malformed input, sender mismatch)
    #[error("Decryption failed: {message}")]
    Decryption {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Input rejected before any transform was attempted
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// No handshake acknowledgement arrived in time
    #[error("Handshake timed out after {timeout:?}")]
    HandshakeTimeout { timeout: Duration },

    /// The other side speaks a different protocol version
    #[error("Handshake protocol version mismatch: expected {expected}, got {actual}")]
    HandshakeVersionMismatch { expected: u32, actual: u32 },

    /// The channel was closed
    #[error("Channel is closed")]
    ChannelClosed,

    /// Application traffic attempted before the handshake completed
    #[error("Channel is not trusted (state: {state:?})")]
    ChannelNotTrusted { state: ChannelState },

    /// Event name is not part of the registered schema
    #[error("Unknown event: {event}")]
    UnknownEvent { event: String },

    /// No matching response event arrived in time
    #[error("Timed out waiting for {event} event after {timeout:?}")]
    ActionTimeout { event: String, timeout: Duration },

    /// The underlying window transport refused the message
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Invalid configuration (origins, durations, schemas)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event bus was disposed
    #[error("Event bus has been disposed")]
    BusDisposed,
}

/// Coarse classification of a [`FrameError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller passed data that can never succeed
    InvalidInput,
    /// Authentication of a ciphertext or its sender failed
    AuthenticationFailure,
    /// The requested algorithm or format is not supported
    Unsupported,
    /// Key material was malformed or unusable
    KeyMaterial,
    /// Channel lifecycle or handshake failure
    Channel,
    /// Configuration mistake caught at construction time
    Configuration,
    /// Payload could not be serialized
    Serialization,
    /// The cryptographic provider failed while sealing
    Internal,
}

impl FrameError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create a key error
    pub fn key(message: impl Into<String>) -> Self {
        Self::Key {
            message: message.into(),
            source: None,
        }
    }

    /// Create a key error wrapping its cause
    pub fn key_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Key {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an encryption error
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
            source: None,
        }
    }

    /// Create a decryption error
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
            source: None,
        }
    }

    /// Create a decryption error wrapping its cause
    pub fn decryption_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Decryption {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Decoding { .. } | Self::Validation { .. } | Self::UnknownEvent { .. } => {
                ErrorCategory::InvalidInput
            }
            Self::Decryption { .. } => ErrorCategory::AuthenticationFailure,
            Self::UnsupportedEncoding { .. } => ErrorCategory::Unsupported,
            Self::Key { .. } => ErrorCategory::KeyMaterial,
            Self::Encryption { .. } => ErrorCategory::Internal,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::HandshakeTimeout { .. }
            | Self::HandshakeVersionMismatch { .. }
            | Self::ChannelClosed
            | Self::ChannelNotTrusted { .. }
            | Self::ActionTimeout { .. }
            | Self::Transport { .. }
            | Self::BusDisposed => ErrorCategory::Channel,
            Self::Config { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether this error ended a handshake attempt
    pub fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout { .. } | Self::HandshakeVersionMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            FrameError::decryption("tag mismatch").category(),
            ErrorCategory::AuthenticationFailure
        );
        assert_eq!(
            FrameError::validation("digit out of range").category(),
            ErrorCategory::InvalidInput
        );
        assert_eq!(
            FrameError::UnsupportedEncoding {
                encoding: "base32".to_string()
            }
            .category(),
            ErrorCategory::Unsupported
        );
        assert_eq!(FrameError::key("bad point").category(), ErrorCategory::KeyMaterial);
        assert_eq!(FrameError::ChannelClosed.category(), ErrorCategory::Channel);
        assert_eq!(
            FrameError::config("wildcard origin").category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_handshake_failures() {
        assert!(FrameError::HandshakeTimeout {
            timeout: Duration::from_secs(1)
        }
        .is_handshake_failure());
        assert!(FrameError::HandshakeVersionMismatch {
            expected: 1,
            actual: 2
        }
        .is_handshake_failure());
        assert!(!FrameError::ChannelClosed.is_handshake_failure());
    }

    #[test]
    fn test_error_messages() {
        let err = FrameError::HandshakeVersionMismatch {
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Handshake protocol version mismatch: expected 1, got 2"
        );

        let err = FrameError::ChannelNotTrusted {
            state: ChannelState::HandshakePending,
        };
        assert_eq!(
            err.to_string(),
            "Channel is not trusted (state: HandshakePending)"
        );
    }

    #[test]
    fn test_wrapped_source() {
        use std::error::Error as _;

        let cause = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad tag");
        let err = FrameError::decryption_with("Failed to decrypt data", cause);
        assert!(err.source().is_some());
        assert!(FrameError::decryption("plain").source().is_none());
    }
}
