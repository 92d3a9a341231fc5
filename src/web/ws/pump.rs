//! Inbound and outbound pumps bridging a WebSocket to the hub.
//!
//! Both pumps are written against `Stream`/`Sink` so any framed transport
//! carrying axum [`Message`]s can drive them. Each one also watches the
//! session's disconnect signal, so a session the hub has dropped stops
//! reading and writing even if the client has stalled.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::relay::{ChatMessage, HubHandle, InboundMessage, Session};

/// Upper bound on the closing handshake with a client that may not be reading.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Read client frames, stamp them and hand them to the hub.
///
/// Stops on a close frame, a read error, end of stream, a frame that is not
/// a JSON message, when the hub has removed the session, or when the hub
/// has gone away. The session is always unregistered on the way out.
pub async fn inbound_pump<S, E>(mut stream: S, session: Session, hub: HubHandle)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = session.disconnected() => {
                tracing::debug!("Hub dropped {}, no longer reading", session.id());
                break;
            }
            frame = stream.next() => frame,
        };
        let Some(frame) = frame else {
            break;
        };

        let parsed = match frame {
            Ok(Message::Text(text)) => InboundMessage::parse(text.as_bytes()),
            Ok(Message::Binary(data)) => InboundMessage::parse(&data),
            Ok(Message::Close(_)) => {
                tracing::debug!("WebSocket closed by client: {}", session.id());
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket read error on {}: {}", session.id(), e);
                break;
            }
        };

        let inbound = match parsed {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::debug!("Malformed message from {}: {}", session.id(), e);
                break;
            }
        };

        if hub
            .broadcast(Some(session.id()), session.stamp(inbound))
            .await
            .is_err()
        {
            break;
        }
    }

    if let Err(e) = hub.unregister(session.id()).await {
        tracing::debug!("Could not unregister {}: {}", session.id(), e);
    }
    tracing::debug!("Inbound pump finished: {}", session.id());
}

/// Write queued messages to the client until the hub closes the queue.
///
/// Once the session is disconnected, a write that cannot complete right away
/// is abandoned. A close frame is sent (best effort, bounded by
/// [`CLOSE_TIMEOUT`]) unless a write failed. The sink is closed either way.
pub async fn outbound_pump<W>(mut sink: W, mut queue: mpsc::Receiver<ChatMessage>, session: Session)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let mut write_failed = false;

    while let Some(message) = queue.recv().await {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize message: {}", e);
                continue;
            }
        };

        tokio::select! {
            biased;
            sent = sink.send(Message::Text(json)) => {
                if let Err(e) = sent {
                    tracing::debug!("WebSocket write failed on {}: {}", session.id(), e);
                    write_failed = true;
                    break;
                }
            }
            _ = session.disconnected() => {
                tracing::debug!("Abandoning stalled write to {}", session.id());
                break;
            }
        }
    }

    let closing = async {
        if !write_failed {
            let _ = sink.send(Message::Close(None)).await;
        }
        let _ = sink.close().await;
    };
    if timeout(CLOSE_TIMEOUT, closing).await.is_err() {
        tracing::debug!("Close handshake with {} timed out", session.id());
    }
    tracing::debug!("Outbound pump finished: {}", session.id());
}
