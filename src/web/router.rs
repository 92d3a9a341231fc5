//! Router configuration for the relay.

use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::relay::HubStats;

use super::error::ApiError;
use super::middleware::create_cors_layer;
use super::ws::{relay_ws_handler, RelayWsState};

/// Create the main router: the WebSocket endpoint and the stats endpoint.
pub fn create_router(state: Arc<RelayWsState>, server: &ServerConfig) -> Router {
    Router::new()
        .route(&server.ws_path, get(relay_ws_handler))
        .route("/stats", get(stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&server.cors_origins)),
        )
        .with_state(state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Membership snapshot handler.
///
/// GET /stats
async fn stats(State(state): State<Arc<RelayWsState>>) -> Result<Json<HubStats>, ApiError> {
    Ok(Json(state.hub.stats().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::config::RelayConfig;
    use crate::relay::{Hub, Session};

    fn test_state() -> Arc<RelayWsState> {
        let relay = RelayConfig::default();
        let hub = Hub::spawn(&relay);
        Arc::new(RelayWsState::new(hub, relay))
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = create_health_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_stats_reports_membership() {
        let state = test_state();
        let (tx, _rx) = mpsc::channel(8);
        state
            .hub
            .register(Session::new("alice", "dev"), tx)
            .await
            .unwrap();

        let router = create_router(state, &ServerConfig::default());
        let response = router
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["members"], 1);
        assert_eq!(json["rooms"]["dev"], 1);
    }

    #[tokio::test]
    async fn test_stats_hub_stopped() {
        let relay = RelayConfig::default();
        let (hub, handle) = Hub::new(&relay);
        drop(hub);
        let state = Arc::new(RelayWsState::new(handle, relay));

        let response = create_router(state, &ServerConfig::default())
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ws_path_rejects_plain_http() {
        let response = create_router(test_state(), &ServerConfig::default())
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
