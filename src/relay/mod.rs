//! Relay core for roomrelay.
//!
//! This module provides:
//! - The connection hub, the single owner of session membership
//! - Session identity and server-side message stamping
//! - The JSON wire message types

mod hub;
mod message;
mod session;

pub use hub::{Hub, HubHandle, HubStats, Outbound};
pub use message::{ChatMessage, InboundMessage};
pub use session::{guest_name, Session, SessionId};
