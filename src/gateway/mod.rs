/// HTTP surface for health, tool listing, and metrics.
///
/// This listener never serves tool invocation — that stays on the MCP
/// transport. It exists so orchestration (probes, Prometheus scrapes) can
/// observe a server whose stdin/stdout belong to an MCP client.
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::{error, info};

use crate::server::ServerState;

#[derive(Clone)]
pub struct GatewayState {
    server: Arc<ServerState>,
    prometheus: Option<PrometheusHandle>,
}

fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tools", get(tools_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// GET /health — liveness plus the active transport.
async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "transport": state.server.transport().to_string(),
    }))
}

/// GET /tools — names of every registered tool.
async fn tools_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.server.registry().tool_names())
}

/// GET /metrics — Prometheus exposition, when metrics are enabled.
async fn metrics_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled\n").into_response(),
    }
}

/// Bind and serve in a background task.
pub async fn start(
    host: &str,
    port: u16,
    server: Arc<ServerState>,
    prometheus: Option<PrometheusHandle>,
) -> Result<tokio::task::JoinHandle<()>> {
    let state = GatewayState { server, prometheus };
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP surface listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP surface error: {}", e);
        }
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Transport};
    use crate::tools::Registry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn make_state() -> GatewayState {
        let registry = Arc::new(Registry::from_config(&Config::default()));
        GatewayState {
            server: Arc::new(ServerState::new(registry, Transport::Http)),
            prometheus: None,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("parse json")
    }

    #[tokio::test]
    async fn health_reports_transport() {
        let app = build_router(make_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["transport"], "http");
    }

    #[tokio::test]
    async fn tools_lists_registered_names() {
        let app = build_router(make_state());
        let response = app
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let names: Vec<String> = serde_json::from_value(body).unwrap();
        assert!(names.contains(&"nmap".to_string()));
        assert_eq!(names.len(), 5);
    }

    #[tokio::test]
    async fn metrics_404_when_disabled() {
        let app = build_router(make_state());
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = build_router(make_state());
        let response = app
            .oneshot(Request::builder().uri("/invoke").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
