//! Typed event maps
//!
//! Each direction of a channel is described by one Rust enum implementing
//! [`EventMap`]. The enum is serialized adjacently tagged, which is the wire
//! shape of every application frame:
//!
//! ```json
//! { "event": "response:sign", "data": { "signature": "..." } }
//! ```
//!
//! Deserializing the enum is the shape check for a payload; [`EventMap::validate`]
//! adds semantic checks the shape cannot express.

use super::constants::handshake_events;
use crate::{FrameError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::marker::PhantomData;

/// A closed set of named events for one direction of a channel
///
/// Implementors are expected to be enums declared with
/// `#[serde(tag = "event", content = "data")]`, one variant per event, with
/// [`EVENTS`](EventMap::EVENTS) listing every variant's wire name.
pub trait EventMap: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Wire names of every event in this map
    const EVENTS: &'static [&'static str];

    /// Wire name of this event
    fn event_name(&self) -> &'static str;

    /// Semantic payload validation beyond the serde shape
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// The registered schema for one direction of a channel
///
/// Built once when a channel is created; construction fails on duplicate or
/// reserved names so a channel never starts with an ambiguous schema.
#[derive(Debug, Clone)]
pub struct EventSchema<E> {
    names: HashSet<&'static str>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EventMap> EventSchema<E> {
    /// Build the schema for `E`
    pub fn new() -> Result<Self> {
        let mut names = HashSet::with_capacity(E::EVENTS.len());

        for name in E::EVENTS {
            if handshake_events::is_reserved(name) {
                return Err(FrameError::config(format!(
                    "Event name '{}' is reserved for the handshake",
                    name
                )));
            }
            if !names.insert(*name) {
                return Err(FrameError::config(format!(
                    "Event name '{}' is registered twice",
                    name
                )));
            }
        }

        Ok(Self {
            names,
            _marker: PhantomData,
        })
    }

    /// Check whether an event name is part of this schema
    pub fn contains(&self, event: &str) -> bool {
        self.names.contains(event)
    }

    /// Resolve an event name to its static form
    pub fn resolve(&self, event: &str) -> Option<&'static str> {
        self.names.get(event).copied()
    }

    /// Decode and validate a raw frame against this schema
    pub fn decode(&self, frame: serde_json::Value) -> Result<E> {
        let event: E = serde_json::from_value(frame)?;
        if !self.contains(event.event_name()) {
            return Err(FrameError::UnknownEvent {
                event: event.event_name().to_string(),
            });
        }
        event.validate()?;
        Ok(event)
    }

    /// Validate and encode an event into a wire frame
    pub fn encode(&self, event: &E) -> Result<serde_json::Value> {
        if !self.contains(event.event_name()) {
            return Err(FrameError::UnknownEvent {
                event: event.event_name().to_string(),
            });
        }
        event.validate()?;
        Ok(serde_json::to_value(event)?)
    }

    /// Number of registered events
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no events
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "event", content = "data")]
    enum HeightEvents {
        #[serde(rename = "ui:height.changed")]
        HeightChanged { height: u32 },
        #[serde(rename = "ui:closed")]
        Closed,
    }

    impl EventMap for HeightEvents {
        const EVENTS: &'static [&'static str] = &["ui:height.changed", "ui:closed"];

        fn event_name(&self) -> &'static str {
            match self {
                HeightEvents::HeightChanged { .. } => "ui:height.changed",
                HeightEvents::Closed => "ui:closed",
            }
        }

        fn validate(&self) -> Result<()> {
            match self {
                HeightEvents::HeightChanged { height } if *height > 10_000 => {
                    Err(FrameError::validation("height out of range"))
                }
                _ => Ok(()),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "event", content = "data")]
    enum Reserved {
        #[serde(rename = "handshakeRequest")]
        Request,
    }

    impl EventMap for Reserved {
        const EVENTS: &'static [&'static str] = &["handshakeRequest"];

        fn event_name(&self) -> &'static str {
            "handshakeRequest"
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "event", content = "data")]
    enum Duplicated {
        #[serde(rename = "a")]
        A,
    }

    impl EventMap for Duplicated {
        const EVENTS: &'static [&'static str] = &["a", "a"];

        fn event_name(&self) -> &'static str {
            "a"
        }
    }

    #[test]
    fn test_schema_construction() {
        let schema = EventSchema::<HeightEvents>::new().unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.contains("ui:closed"));
        assert!(!schema.contains("ui:opened"));
        assert_eq!(schema.resolve("ui:closed"), Some("ui:closed"));

        assert!(EventSchema::<Reserved>::new().is_err());
        assert!(EventSchema::<Duplicated>::new().is_err());
    }

    #[test]
    fn test_wire_shape() {
        let schema = EventSchema::<HeightEvents>::new().unwrap();
        let frame = schema
            .encode(&HeightEvents::HeightChanged { height: 420 })
            .unwrap();
        assert_eq!(
            frame,
            json!({ "event": "ui:height.changed", "data": { "height": 420 } })
        );
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        let schema = EventSchema::<HeightEvents>::new().unwrap();

        let decoded = schema
            .decode(json!({ "event": "ui:height.changed", "data": { "height": 12 } }))
            .unwrap();
        assert_eq!(decoded, HeightEvents::HeightChanged { height: 12 });

        // wrong payload type
        assert!(schema
            .decode(json!({ "event": "ui:height.changed", "data": { "height": "tall" } }))
            .is_err());
        // unknown event
        assert!(schema
            .decode(json!({ "event": "ui:opened", "data": {} }))
            .is_err());
        // semantic validation
        let err = schema
            .decode(json!({ "event": "ui:height.changed", "data": { "height": 20000 } }))
            .unwrap_err();
        assert!(matches!(err, FrameError::Validation { .. }));
    }

    #[test]
    fn test_encode_validates() {
        let schema = EventSchema::<HeightEvents>::new().unwrap();
        let err = schema
            .encode(&HeightEvents::HeightChanged { height: 50_000 })
            .unwrap_err();
        assert!(matches!(err, FrameError::Validation { .. }));
    }
}
