//! Explicit publish/subscribe bus
//!
//! An application creates one [`EventBus`] per scope it needs (for example
//! the host page's UI state), hands clones to whoever publishes or listens,
//! and disposes it when the scope ends.

use crate::{FrameError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// A cloneable publish/subscribe handle
#[derive(Debug, Clone)]
pub struct EventBus<T> {
    sender: Arc<RwLock<Option<broadcast::Sender<T>>>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Create a bus buffering [`DEFAULT_BUS_CAPACITY`] events per subscriber
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Create a bus with a specific per-subscriber buffer
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(RwLock::new(Some(sender))),
        }
    }

    /// Publish an event; returns how many subscribers will see it
    pub fn publish(&self, event: T) -> Result<usize> {
        let sender = self.sender.read();
        let sender = sender.as_ref().ok_or(FrameError::BusDisposed)?;
        // no subscribers is not an error
        Ok(sender.send(event).unwrap_or(0))
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> Result<broadcast::Receiver<T>> {
        self.sender
            .read()
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(FrameError::BusDisposed)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Dispose the bus; subscribers see the stream end
    pub fn dispose(&self) {
        if self.sender.write().take().is_some() {
            tracing::debug!("Event bus disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called
    pub fn is_disposed(&self) -> bool {
        self.sender.read().is_none()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
