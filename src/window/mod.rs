//! Window transports: the seam between a channel and the platform
//!
//! A channel never touches a platform window directly. Outbound frames go
//! through a [`WindowTransport`]; inbound frames arrive on an [`Inbox`] fed by
//! whatever owns the platform's message event.
//!
//! # Architecture
//!
//! - [`WindowTransport`] - post a frame to one target window with an explicit origin
//! - [`LoggedTransport`] - decorator tracing every post of an inner transport
//! - [`WindowOpener`] - open a new child window (`window.open`)
//! - [`memory`] - in-process window pairs with postMessage delivery rules
//! - [`popup`] - popup placement and `window.open` feature strings

pub mod memory;
pub mod popup;

use crate::types::{InboundMessage, Origin, WindowId};
use crate::Result;
use serde_json::Value;
use tokio::sync::mpsc;

/// Inbound frames delivered to this context
pub type Inbox = mpsc::UnboundedReceiver<InboundMessage>;

/// Handle for posting frames to one target window
///
/// Implementations must deliver the frame only if the target window's origin
/// equals `target_origin`, the way `postMessage(data, targetOrigin)` does.
pub trait WindowTransport: Send + Sync {
    /// Identity of the target window
    ///
    /// Inbound frames whose `source` differs from this id did not come from
    /// the window this transport talks to.
    fn window_id(&self) -> WindowId;

    /// Post a frame to the target window
    fn post(&self, message: &Value, target_origin: &Origin) -> Result<()>;
}

impl<T: WindowTransport + ?Sized> WindowTransport for Box<T> {
    fn window_id(&self) -> WindowId {
        (**self).window_id()
    }

    fn post(&self, message: &Value, target_origin: &Origin) -> Result<()> {
        (**self).post(message, target_origin)
    }
}

/// A transport that traces every frame it posts
pub struct LoggedTransport<T> {
    inner: T,
    label: String,
}

impl<T: WindowTransport> LoggedTransport<T> {
    /// Wrap a transport; `label` names it in log lines
    pub fn new(inner: T, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }

    /// Get the wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Unwrap the transport
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: WindowTransport> WindowTransport for LoggedTransport<T> {
    fn window_id(&self) -> WindowId {
        self.inner.window_id()
    }

    fn post(&self, message: &Value, target_origin: &Origin) -> Result<()> {
        let event = message.get("event").and_then(Value::as_str).unwrap_or("<untagged>");
        tracing::debug!(
            transport = %self.label,
            window = %self.inner.window_id(),
            origin = %target_origin,
            event,
            "Posting frame"
        );

        let result = self.inner.post(message, target_origin);
        if let Err(ref e) = result {
            tracing::warn!(transport = %self.label, event, "Post failed: {}", e);
        }
        result
    }
}

/// A newly opened child window
pub struct OpenedWindow {
    /// Transport posting to the new window
    pub transport: Box<dyn WindowTransport>,
    /// Frames the new window posts back to us
    pub inbox: Inbox,
}

/// Opens child windows (`window.open`)
pub trait WindowOpener {
    /// Open `url` in a window named `name` with a feature string
    ///
    /// Fails with [`FrameError::Transport`](crate::FrameError::Transport) when
    /// the platform refuses to open the window.
    fn open(&self, url: &str, name: &str, features: &str) -> Result<OpenedWindow>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::memory::window_pair;
    use serde_json::json;

    #[tokio::test]
    async fn test_logged_transport_forwards() {
        let parent = Origin::parse("https://host.example").unwrap();
        let child = Origin::parse("https://signer.example").unwrap();
        let (host, mut signer) = window_pair(parent.clone(), child.clone());

        let id = host.transport.window_id();
        let logged = LoggedTransport::new(host.transport, "host->signer");
        assert_eq!(logged.window_id(), id);

        logged.post(&json!({ "event": "ping" }), &child).unwrap();
        let received = signer.inbox.recv().await.unwrap();
        assert_eq!(received.event(), Some("ping"));
        assert_eq!(received.origin, parent.as_str());
    }
}
