//! Protocol constants and defaults

use std::time::Duration;

/// Handshake protocol version spoken by this crate
pub const PROTOCOL_VERSION: u32 = 1;

/// Default time to wait for the other side to acknowledge a handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between handshake request retries
pub const DEFAULT_HANDSHAKE_INTERVAL: Duration = Duration::from_millis(100);

/// Default time to wait for a response event in a request/response action
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_millis(7_000);

/// Response timeout used by signer iframe call sites
pub const SIGNER_ACTION_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Resend interval used by signer iframe call sites
pub const SIGNER_ACTION_INTERVAL: Duration = Duration::from_millis(5_000);

/// Handshake control event names
///
/// These names are reserved: an application event map may not reuse them.
pub mod handshake_events {
    /// Parent → child: start a handshake
    pub const REQUEST: &str = "handshakeRequest";
    /// Child → parent: acknowledge a request
    pub const RESPONSE: &str = "handshakeResponse";
    /// Parent → child: handshake finished
    pub const COMPLETE: &str = "handshakeComplete";

    /// Check if an event name is a reserved handshake control name
    pub fn is_reserved(event: &str) -> bool {
        matches!(event, REQUEST | RESPONSE | COMPLETE)
    }

    /// Get all reserved names
    pub fn all() -> Vec<&'static str> {
        vec![REQUEST, RESPONSE, COMPLETE]
    }
}
