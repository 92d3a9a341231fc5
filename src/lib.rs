//! roomrelay - room-scoped real-time WebSocket message relay.
//!
//! Clients connect to `/ws?username=NAME&room=ROOM` and every JSON message
//! they send is stamped with their identity and relayed to the other
//! sessions in the same room.

pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod web;

pub use config::Config;
pub use error::{RelayError, Result};
pub use relay::{ChatMessage, Hub, HubHandle, HubStats, InboundMessage, Session, SessionId};
pub use web::RelayServer;
