//! Per-connection session identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::message::{ChatMessage, InboundMessage};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique token identifying a session within the process.
///
/// Ids are assigned monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next id.
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Identity and room of one connected client.
///
/// Clones share one disconnect signal, which fires when the hub drops the
/// session's membership.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    username: String,
    room: String,
    disconnect: CancellationToken,
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.username == other.username && self.room == other.room
    }
}

impl Eq for Session {}

impl Session {
    /// Create a session with a freshly allocated id.
    pub fn new(username: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            id: SessionId::next(),
            username: username.into(),
            room: room.into(),
            disconnect: CancellationToken::new(),
        }
    }

    /// Get the session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the display name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the room.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Resolve once the hub has removed this session.
    pub async fn disconnected(&self) {
        self.disconnect.cancelled().await
    }

    /// Guard that fires the disconnect signal when dropped.
    pub(crate) fn disconnect_guard(&self) -> DropGuard {
        self.disconnect.clone().drop_guard()
    }

    /// Turn a client message into a relayed message.
    ///
    /// Username and room come from the session and the timestamp from the
    /// server clock.
    pub fn stamp(&self, inbound: InboundMessage) -> ChatMessage {
        ChatMessage {
            username: self.username.clone(),
            content: inbound.content,
            room: self.room.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Generate a name for a client that did not supply one.
pub fn guest_name() -> String {
    format!("User_{}", rand::random_range(0..1000u32))
}
