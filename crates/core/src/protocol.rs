// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel wire frames.
//!
//! Every frame in both directions is a JSON text message:
//!
//! ```text
//! { "event": "<name>", "payload": { ... } }
//! ```
//!
//! The server sends `ping` frames carrying a `pingId`; the client answers with
//! a `pong` frame echoing the id and adding its own `timestamp`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event name of server keepalive probes.
pub const PING: &str = "ping";

/// Event name of the client's keepalive reply.
pub const PONG: &str = "pong";

/// Subscription key that receives every event.
pub const WILDCARD: &str = "*";

/// A single realtime frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Creates a frame for the given event.
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Envelope {
            event: event.into(),
            payload,
        }
    }

    /// Returns true for server keepalive probes.
    pub fn is_ping(&self) -> bool {
        self.event == PING
    }

    /// The correlation id of a ping, `null` when the server sent none.
    pub fn ping_id(&self) -> Value {
        self.payload.get("pingId").cloned().unwrap_or(Value::Null)
    }

    /// Builds the `pong` answering this frame.
    pub fn pong(&self, timestamp_ms: i64) -> Envelope {
        let mut payload = Map::new();
        payload.insert("pingId".to_string(), self.ping_id());
        payload.insert("timestamp".to_string(), Value::from(timestamp_ms));
        Envelope::new(PONG, Value::Object(payload))
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
