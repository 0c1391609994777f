//! Channel lifecycle states

use serde::{Deserialize, Serialize};

/// Lifecycle state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelState {
    /// Constructed, no handshake attempted (or the last attempt failed)
    Uninitialized,
    /// A handshake is in progress
    HandshakePending,
    /// Handshake completed; application traffic is allowed
    Trusted,
    /// Torn down; listeners detached and the window reference dropped
    Closed,
}

impl ChannelState {
    /// Whether application events may flow
    pub fn is_trusted(&self) -> bool {
        matches!(self, ChannelState::Trusted)
    }

    /// Whether the channel has been closed
    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelState::Closed)
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// Which half of the handshake a channel plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Host page side; initiates the handshake
    Parent,
    /// Embedded iframe or popup side; acknowledges the handshake
    Child,
}

impl Role {
    /// Get the role name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Child => "child",
        }
    }
}
