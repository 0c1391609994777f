//! Raw inbound frames and window identities

use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a window or frame
///
/// Plays the role of the `source` window reference the platform attaches to
/// every inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Allocate a fresh, process-unique window id
    pub fn next() -> Self {
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// One message delivered to this context by the platform
///
/// The platform hands over every message addressed to the current context,
/// whoever sent it; nothing here has been checked yet.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Structured-clone payload of the message
    pub data: Value,
    /// Origin of the sending context, as reported by the platform
    pub origin: String,
    /// Sending window, when the platform exposes it
    pub source: Option<WindowId>,
}

impl InboundMessage {
    /// Create an inbound message without a source window
    pub fn new(data: Value, origin: impl Into<String>) -> Self {
        Self {
            data,
            origin: origin.into(),
            source: None,
        }
    }

    /// Set the source window
    pub fn with_source(mut self, source: WindowId) -> Self {
        self.source = Some(source);
        self
    }

    /// Get the event tag of the frame, if it carries one
    pub fn event(&self) -> Option<&str> {
        self.data.get("event").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_window_ids_are_unique() {
        let a = WindowId::next();
        let b = WindowId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_event_tag() {
        let message = InboundMessage::new(json!({ "event": "ready", "data": {} }), "https://a.com");
        assert_eq!(message.event(), Some("ready"));
        assert!(message.source.is_none());

        let message = InboundMessage::new(json!("not an object"), "https://a.com");
        assert_eq!(message.event(), None);

        let message = InboundMessage::new(json!({ "event": 7 }), "https://a.com");
        assert_eq!(message.event(), None);
    }
}
