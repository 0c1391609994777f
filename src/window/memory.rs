//! In-process window pairs
//!
//! Two connected windows that follow postMessage delivery rules: a frame
//! reaches the other window only if the target origin names that window's
//! origin, and every delivered frame carries the sender's origin and window
//! id. Tests and the demo binary run real channels over these.

use super::{Inbox, WindowTransport};
use crate::types::{InboundMessage, Origin, WindowId};
use crate::{FrameError, Result};
use serde_json::Value;
use tokio::sync::mpsc;

/// Posts frames into a peer window's inbox
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    own_origin: Origin,
    own_id: WindowId,
    peer_origin: Origin,
    peer_id: WindowId,
    peer: mpsc::UnboundedSender<InboundMessage>,
}

impl WindowTransport for MemoryTransport {
    fn window_id(&self) -> WindowId {
        self.peer_id
    }

    fn post(&self, message: &Value, target_origin: &Origin) -> Result<()> {
        if target_origin != &self.peer_origin {
            // postMessage drops frames addressed to another origin without telling the sender
            tracing::trace!(
                target_origin = %target_origin,
                actual = %self.peer_origin,
                "Frame not delivered: target origin mismatch"
            );
            return Ok(());
        }

        let frame = InboundMessage::new(message.clone(), self.own_origin.as_str())
            .with_source(self.own_id);

        self.peer
            .send(frame)
            .map_err(|_| FrameError::transport(format!("Window {} is gone", self.peer_id)))
    }
}

/// One side of a window pair
#[derive(Debug)]
pub struct MemoryWindow {
    /// This window's identity
    pub id: WindowId,
    /// This window's origin
    pub origin: Origin,
    /// Posts to the other window
    pub transport: MemoryTransport,
    /// Frames delivered to this window
    pub inbox: Inbox,
    /// Pushes arbitrary frames into this window's inbox, as any other
    /// window on the page could
    pub injector: mpsc::UnboundedSender<InboundMessage>,
}

/// Create two connected windows, the first at `parent_origin`, the second at `child_origin`
pub fn window_pair(parent_origin: Origin, child_origin: Origin) -> (MemoryWindow, MemoryWindow) {
    let parent_id = WindowId::next();
    let child_id = WindowId::next();

    let (parent_tx, parent_rx) = mpsc::unbounded_channel();
    let (child_tx, child_rx) = mpsc::unbounded_channel();

    let parent = MemoryWindow {
        id: parent_id,
        origin: parent_origin.clone(),
        transport: MemoryTransport {
            own_origin: parent_origin.clone(),
            own_id: parent_id,
            peer_origin: child_origin.clone(),
            peer_id: child_id,
            peer: child_tx.clone(),
        },
        inbox: parent_rx,
        injector: parent_tx.clone(),
    };

    let child = MemoryWindow {
        id: child_id,
        origin: child_origin.clone(),
        transport: MemoryTransport {
            own_origin: child_origin,
            own_id: child_id,
            peer_origin: parent_origin,
            peer_id: parent_id,
            peer: parent_tx,
        },
        inbox: child_rx,
        injector: child_tx,
    };

    (parent, child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origins() -> (Origin, Origin) {
        (
            Origin::parse("https://host.example").unwrap(),
            Origin::parse("https://signer.example").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_delivery_stamps_sender() {
        let (parent_origin, child_origin) = origins();
        let (parent, mut child) = window_pair(parent_origin.clone(), child_origin.clone());

        parent
            .transport
            .post(&json!({ "event": "hello" }), &child_origin)
            .unwrap();

        let frame = child.inbox.recv().await.unwrap();
        assert_eq!(frame.origin, parent_origin.as_str());
        assert_eq!(frame.source, Some(parent.id));
        assert_eq!(parent.transport.window_id(), child.id);
    }

    #[tokio::test]
    async fn test_wrong_target_origin_is_not_delivered() {
        let (parent_origin, child_origin) = origins();
        let (parent, mut child) = window_pair(parent_origin, child_origin);

        let elsewhere = Origin::parse("https://evil.example").unwrap();
        parent
            .transport
            .post(&json!({ "event": "hello" }), &elsewhere)
            .unwrap();

        assert!(child.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_post_to_dropped_window_fails() {
        let (parent_origin, child_origin) = origins();
        let (parent, child) = window_pair(parent_origin, child_origin.clone());
        let MemoryWindow { inbox, injector, .. } = child;
        drop(inbox);
        drop(injector);

        let err = parent
            .transport
            .post(&json!({ "event": "hello" }), &child_origin)
            .unwrap_err();
        assert!(matches!(err, FrameError::Transport { .. }));
    }
}
