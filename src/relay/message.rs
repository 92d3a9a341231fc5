//! Wire messages relayed between sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A relayed chat message.
///
/// Every field except `content` is stamped by the server; see
/// [`Session::stamp`](super::Session::stamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Sender's display name.
    pub username: String,
    /// Message content.
    pub content: String,
    /// Room the message was sent in.
    pub room: String,
    /// Time the server accepted the message.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message timestamped now.
    pub fn new(
        username: impl Into<String>,
        room: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            content: content.into(),
            room: room.into(),
            timestamp: Utc::now(),
        }
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A message as received from a client.
///
/// Only `content` is read. Any `username`, `room` or `timestamp` the client
/// supplies is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    /// Message content.
    #[serde(default)]
    pub content: String,
}

impl InboundMessage {
    /// Parse a client frame payload.
    pub fn parse(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}
