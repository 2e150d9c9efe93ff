//! Liveness probes and the placeholder users endpoint
//!
//! Probes answer `healthy` unconditionally: they report that the HTTP server
//! is up, not that a browser can be launched.

use axum::{routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
}

impl HealthResponse {
    fn healthy(service: &'static str) -> Self {
        Self {
            status: "healthy",
            service,
            version: None,
        }
    }
}

async fn capture_health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("webpage-capture"))
}

async fn api_health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("user-service"))
}

async fn root_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        version: Some(env!("CARGO_PKG_VERSION")),
        ..HealthResponse::healthy("webpage-capture")
    })
}

async fn list_users() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Users endpoint",
        "status": "active",
    }))
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(root_health))
        .route("/api/health", get(api_health))
        .route("/api/capture/health", get(capture_health))
        .route("/api/users", get(list_users))
}
