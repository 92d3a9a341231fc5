//! WebSocket module for the relay.
//!
//! This module provides:
//! - The upgrade handler that turns a connection into a hub session
//! - The inbound and outbound pumps that move messages between socket and hub

pub mod pump;
pub mod relay;

pub use pump::{inbound_pump, outbound_pump};
pub use relay::{relay_ws_handler, RelayWsState, WsQuery};
