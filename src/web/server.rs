//! Web server for roomrelay.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::{Config, ServerConfig};
use crate::relay::{Hub, HubHandle};
use crate::{RelayError, Result};

use super::router::{create_health_router, create_router};
use super::ws::RelayWsState;

/// Relay server: the hub plus the HTTP/WebSocket front end.
pub struct RelayServer {
    /// Server address.
    addr: SocketAddr,
    /// Handler state shared by every connection.
    state: Arc<RelayWsState>,
    /// Server configuration.
    server_config: ServerConfig,
}

impl RelayServer {
    /// Create a new relay server and start its hub.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse::<SocketAddr>()
            .map_err(|e| {
                RelayError::Validation(format!(
                    "invalid server address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        let hub = Hub::spawn(&config.relay);

        Ok(Self {
            addr,
            state: Arc::new(RelayWsState::new(hub, config.relay.clone())),
            server_config: config.server.clone(),
        })
    }

    /// Get the configured server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get a handle to the hub.
    pub fn hub(&self) -> HubHandle {
        self.state.hub.clone()
    }

    fn router(&self) -> Router {
        create_router(self.state.clone(), &self.server_config).merge(create_health_router())
    }

    /// Run the server until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "Relay listening on ws://{}{}?username=NAME&room=ROOM",
            local_addr,
            self.server_config.ws_path
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Relay listening on {}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Relay server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Signal received, starting graceful shutdown");
}
