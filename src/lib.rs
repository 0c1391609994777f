//! # secure-frame
//!
//! A **type-safe** Rust implementation of origin-validated, handshake-based
//! messaging between a host page and an embedded window (a signer iframe or a
//! checkout popup), with the envelope cryptography that protects payloads
//! carried over it.
//!
//! ## Features
//!
//! - 🔒 **Origin validation**: every frame is checked against one exact target origin, wildcards are unrepresentable
//! - 🤝 **Handshake**: request/response/complete exchange with retries, timeout and protocol version check
//! - 🧾 **Typed events**: each direction is a serde-tagged enum; payloads are validated before any handler runs
//! - 🔁 **Actions**: request/response correlation over the pub/sub channel with timeouts and re-sends
//! - 🔐 **Envelope cryptography**: HPKE (P-256, HKDF-SHA256, AES-256-GCM), ECDH key agreement, AES-GCM
//! - 🔢 **Format-preserving encryption**: FF1 for OTP codes and other digit strings (feature `fpe`)
//! - 🪟 **Popups**: placement, `window.open` feature strings and parent channels for popups
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use secure_frame::{Channel, ChannelConfig};
//! use secure_frame::types::EventMap;
//! use secure_frame::window::memory::window_pair;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(tag = "event", content = "data")]
//! enum Status {
//!     #[serde(rename = "status")]
//!     Status { ready: bool },
//! }
//!
//! impl EventMap for Status {
//!     const EVENTS: &'static [&'static str] = &["status"];
//!     fn event_name(&self) -> &'static str {
//!         "status"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> secure_frame::Result<()> {
//!     let host = "https://shop.example".parse()?;
//!     let signer = "https://signer.example".parse()?;
//!     let (host_window, _signer_window) = window_pair(host, signer);
//!
//!     let channel: Channel<Status, Status> = Channel::parent(
//!         ChannelConfig::new("https://signer.example")?,
//!         Box::new(host_window.transport),
//!     )?;
//!     tokio::spawn(channel.clone().listen(host_window.inbox));
//!
//!     channel.on("status", |event| println!("signer says {:?}", event))?;
//!     channel.handshake().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate is organized into several modules:
//!
//! - **`types`**: Origins, event maps, inbound frames, states and protocol constants
//! - **`channel`**: The handshake-gated channel, its configuration and actions
//! - **`window`**: Transport seam, in-memory windows, logging decorator and popups
//! - **`crypto`**: Encodings, keys, HPKE envelopes, AES-GCM and FPE
//! - **`bus`**: An explicit publish/subscribe handle for application events
//! - **`error`**: Comprehensive error handling
//!
//! ## Optional Features
//!
//! - **`fpe`** (default): FF1 format-preserving encryption and the `handshake-demo` binary

pub mod bus;
pub mod channel;
pub mod crypto;
pub mod error;
pub mod types;
pub mod window;

// Re-exports for convenience
pub use bus::EventBus;
pub use channel::{ActionOptions, Channel, ChannelConfig, HandshakeOptions};
pub use error::{ErrorCategory, FrameError, Result};
pub use types::{ChannelState, EventMap, InboundMessage, Origin, Role, WindowId};
pub use window::{Inbox, WindowTransport};

/// Current version of the secure-frame library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handshake protocol version spoken by this library
pub use types::PROTOCOL_VERSION;
