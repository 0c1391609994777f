//! Handshake control messages
//!
//! Three frames, all outside the application schemas:
//!
//! ```text
//! parent                                child
//!   | -- handshakeRequest {id, v} ------> |   (repeated every interval)
//!   | <----- handshakeResponse {id, v} -- |
//!   | -- handshakeComplete {id} --------> |
//! ```

use crate::types::constants::{handshake_events, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A handshake control frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum HandshakeMessage {
    /// Parent asks the child to prove it is listening
    #[serde(rename = "handshakeRequest", rename_all = "camelCase")]
    Request {
        request_verification_id: String,
        #[serde(default = "legacy_protocol_version")]
        protocol_version: u32,
    },
    /// Child echoes the request id with its own version
    #[serde(rename = "handshakeResponse", rename_all = "camelCase")]
    Response {
        request_verification_id: String,
        #[serde(default = "legacy_protocol_version")]
        protocol_version: u32,
    },
    /// Parent confirms the child's response
    #[serde(rename = "handshakeComplete", rename_all = "camelCase")]
    Complete { request_verification_id: String },
}

/// Peers that predate version negotiation speak version 1
fn legacy_protocol_version() -> u32 {
    PROTOCOL_VERSION
}

impl HandshakeMessage {
    /// Parse a control frame; `None` if the frame is not a well-formed control message
    pub fn from_frame(frame: &Value) -> Option<Self> {
        serde_json::from_value(frame.clone()).ok()
    }

    /// Wire name of this message
    pub fn event_name(&self) -> &'static str {
        match self {
            HandshakeMessage::Request { .. } => handshake_events::REQUEST,
            HandshakeMessage::Response { .. } => handshake_events::RESPONSE,
            HandshakeMessage::Complete { .. } => handshake_events::COMPLETE,
        }
    }

    /// The verification id carried by this message
    pub fn verification_id(&self) -> &str {
        match self {
            HandshakeMessage::Request {
                request_verification_id,
                ..
            }
            | HandshakeMessage::Response {
                request_verification_id,
                ..
            }
            | HandshakeMessage::Complete {
                request_verification_id,
            } => request_verification_id,
        }
    }
}

/// A fresh random verification id
pub fn new_verification_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let request = HandshakeMessage::Request {
            request_verification_id: "abc".to_string(),
            protocol_version: 1,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "event": "handshakeRequest",
                "data": { "requestVerificationId": "abc", "protocolVersion": 1 }
            })
        );

        let complete = HandshakeMessage::Complete {
            request_verification_id: "abc".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&complete).unwrap(),
            json!({ "event": "handshakeComplete", "data": { "requestVerificationId": "abc" } })
        );
        assert_eq!(complete.event_name(), handshake_events::COMPLETE);
        assert_eq!(complete.verification_id(), "abc");
    }

    #[test]
    fn test_missing_version_is_legacy() {
        let parsed = HandshakeMessage::from_frame(&json!({
            "event": "handshakeResponse",
            "data": { "requestVerificationId": "xyz" }
        }))
        .unwrap();

        assert_eq!(
            parsed,
            HandshakeMessage::Response {
                request_verification_id: "xyz".to_string(),
                protocol_version: PROTOCOL_VERSION,
            }
        );
    }

    #[test]
    fn test_malformed_control_frames() {
        assert!(HandshakeMessage::from_frame(&json!({ "event": "handshakeRequest" })).is_none());
        assert!(HandshakeMessage::from_frame(&json!({
            "event": "handshakeRequest",
            "data": { "requestVerificationId": 7 }
        }))
        .is_none());
        assert!(HandshakeMessage::from_frame(&json!({ "event": "other", "data": {} })).is_none());
    }

    #[test]
    fn test_verification_ids_are_unique() {
        assert_ne!(new_verification_id(), new_verification_id());
        assert_eq!(new_verification_id().len(), 32);
    }
}
