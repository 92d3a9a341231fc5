//! Relay WebSocket handler.
//!
//! `GET /ws?username={name}&room={room}` upgrades the connection, registers a
//! session with the hub and starts its pumps.

use axum::{
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::relay::{guest_name, HubHandle, Session};

use super::pump::{inbound_pump, outbound_pump};

/// Query parameters for WebSocket connection.
#[derive(Debug, Default, serde::Deserialize)]
pub struct WsQuery {
    /// Display name. A guest name is generated when absent.
    pub username: Option<String>,
    /// Room to join. The default room is used when absent.
    pub room: Option<String>,
}

/// State for the relay WebSocket handler.
#[derive(Clone)]
pub struct RelayWsState {
    /// Hub the sessions register with.
    pub hub: HubHandle,
    /// Relay configuration.
    pub relay: RelayConfig,
}

impl RelayWsState {
    /// Create a new relay WebSocket state.
    pub fn new(hub: HubHandle, relay: RelayConfig) -> Self {
        Self { hub, relay }
    }
}

/// Resolve the display name from the query.
fn resolve_username(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => guest_name(),
    }
}

/// Resolve the room from the query.
fn resolve_room(requested: Option<&str>, relay: &RelayConfig) -> String {
    if !relay.multi_room {
        return relay.default_room.clone();
    }
    match requested.map(str::trim) {
        Some(room) if !room.is_empty() => room.to_string(),
        _ => relay.default_room.clone(),
    }
}

/// WebSocket relay handler.
pub async fn relay_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayWsState>>,
    Query(query): Query<WsQuery>,
) -> Response {
    let username = resolve_username(query.username.as_deref());
    let room = resolve_room(query.room.as_deref(), &state.relay);

    tracing::info!("Connection attempt: {} -> room {}", username, room);

    let session = Session::new(username, room);
    ws.max_message_size(state.relay.max_message_bytes)
        .on_failed_upgrade(|e: axum::Error| tracing::debug!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_socket(socket, state, session))
}

/// Register the session and start its pumps.
async fn handle_socket(socket: WebSocket, state: Arc<RelayWsState>, session: Session) {
    let (queue_tx, queue_rx) = mpsc::channel(state.relay.queue_capacity.max(1));

    if let Err(e) = state.hub.register(session.clone(), queue_tx).await {
        tracing::warn!("Dropping connection {}: {}", session.id(), e);
        return;
    }

    let (ws_sender, ws_receiver) = socket.split();

    // The socket closes once both halves are dropped, i.e. when both pumps
    // have finished.
    tokio::spawn(outbound_pump(ws_sender, queue_rx, session.clone()));
    tokio::spawn(inbound_pump(ws_receiver, session, state.hub.clone()));
}
