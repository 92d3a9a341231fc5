//! Test helpers for relay E2E tests.
//!
//! Provides a TestServer bound to an ephemeral port and a TestClient
//! speaking the JSON wire format over WebSocket.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use roomrelay::{Config, RelayServer};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding that nothing will arrive.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A relay server running in the background.
pub struct TestServer {
    pub addr: SocketAddr,
}

impl TestServer {
    /// Start a server with the default relay settings.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server after adjusting the configuration.
    pub async fn start_with<F: FnOnce(&mut Config)>(adjust: F) -> Self {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        adjust(&mut config);

        let server = RelayServer::new(&config).unwrap();
        let addr = server.run_with_addr().await.unwrap();
        Self { addr }
    }

    /// Build the WebSocket URL for the given query string.
    pub fn ws_url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("ws://{}/ws", self.addr)
        } else {
            format!("ws://{}/ws?{}", self.addr, query)
        }
    }

    /// Connect and wait until the hub has registered the session.
    pub async fn join(&self, username: &str, room: &str) -> TestClient {
        let before = self.members().await;
        let client = TestClient::connect(&self.ws_url(&format!("username={username}&room={room}"))).await;
        self.wait_for_members(before + 1).await;
        client
    }

    /// Fetch the current membership snapshot.
    pub async fn stats(&self) -> Value {
        reqwest::get(format!("http://{}/stats", self.addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Current number of registered sessions.
    pub async fn members(&self) -> u64 {
        self.stats().await["members"].as_u64().unwrap()
    }

    /// Poll the stats endpoint until the member count matches.
    pub async fn wait_for_members(&self, expected: u64) {
        let result = timeout(DEFAULT_TIMEOUT, async {
            loop {
                if self.members().await == expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "timed out waiting for {expected} members");
    }
}

/// WebSocket test client.
pub struct TestClient {
    ws: WsStream,
}

impl TestClient {
    /// Connect to a relay WebSocket URL.
    pub async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.unwrap();
        Self { ws }
    }

    /// Send raw text.
    pub async fn send_text(&mut self, text: &str) {
        self.ws.send(Message::Text(text.to_string())).await.unwrap();
    }

    /// Send a message with the given content.
    pub async fn say(&mut self, content: &str) {
        self.send_text(&serde_json::json!({ "content": content }).to_string())
            .await;
    }

    /// Send a message, tolerating a connection the server already dropped.
    pub async fn try_say(&mut self, content: &str) -> bool {
        let text = serde_json::json!({ "content": content }).to_string();
        self.ws.send(Message::Text(text)).await.is_ok()
    }

    /// Receive the next relayed message.
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let frame = timeout(DEFAULT_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a message")
                .expect("connection ended")
                .expect("read error");
            match frame {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("Expected text frame, got {other:?}"),
            }
        }
    }

    /// Assert that no message arrives within the quiet period.
    pub async fn assert_silent(&mut self) {
        if let Ok(Some(frame)) = timeout(QUIET_PERIOD, self.ws.next()).await {
            panic!("Expected no message, got {frame:?}");
        }
    }

    /// Wait until the server closes the connection.
    ///
    /// Returns true if a close frame was seen before the stream ended.
    pub async fn expect_closed(&mut self) -> bool {
        let mut saw_close = false;
        let result = timeout(DEFAULT_TIMEOUT, async {
            while let Some(frame) = self.ws.next().await {
                match frame {
                    Ok(Message::Close(_)) => saw_close = true,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        })
        .await;
        assert!(result.is_ok(), "connection was not closed");
        saw_close
    }

    /// Close the connection from the client side.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
