//! Core types for the secure frame protocol
//!
//! This module defines the data structures shared by the channel and window
//! layers: origins, typed event maps, raw inbound frames, lifecycle states and
//! protocol constants.
//!
//! # Architecture
//!
//! The types module is organized as follows:
//! - [`origin`] - Validated `http`/`https` origins
//! - [`event`] - The [`EventMap`] trait and per-direction [`EventSchema`]
//! - [`message`] - Raw [`InboundMessage`] frames and [`WindowId`]s
//! - [`state`] - [`ChannelState`] and handshake [`Role`]
//! - [`constants`] - Protocol version, reserved names and default timings
//!
//! # Examples
//!
//! ## Declaring an event map
//!
//! ```
//! use secure_frame::types::EventMap;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(tag = "event", content = "data")]
//! enum SignerResponses {
//!     #[serde(rename = "response:sign")]
//!     Sign { signature: String },
//!     #[serde(rename = "response:get-status")]
//!     Status { ready: bool },
//! }
//!
//! impl EventMap for SignerResponses {
//!     const EVENTS: &'static [&'static str] = &["response:sign", "response:get-status"];
//!
//!     fn event_name(&self) -> &'static str {
//!         match self {
//!             SignerResponses::Sign { .. } => "response:sign",
//!             SignerResponses::Status { .. } => "response:get-status",
//!         }
//!     }
//! }
//! ```
//!
//! ## Parsing origins
//!
//! ```
//! use secure_frame::types::Origin;
//!
//! # fn example() -> secure_frame::Result<()> {
//! let origin = Origin::parse("https://signers.crossmint.com")?;
//! assert_eq!(origin.as_str(), "https://signers.crossmint.com");
//!
//! // Popups and iframes usually derive their target from the page URL
//! let origin = Origin::from_url("https://www.crossmint.com/checkout?order=1")?;
//! assert_eq!(origin.as_str(), "https://www.crossmint.com");
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod event;
pub mod message;
pub mod origin;
pub mod state;

// Re-export commonly used types
pub use constants::{handshake_events, PROTOCOL_VERSION};
pub use event::{EventMap, EventSchema};
pub use message::{InboundMessage, WindowId};
pub use origin::Origin;
pub use state::{ChannelState, Role};
