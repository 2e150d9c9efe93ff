//! HTTP front door
//!
//! Routes capture requests to a [`PageCapturer`], exposes the health probes,
//! and serves the single-page application bundle for every other path.

use crate::{
    capture_page, health, normalize_url, render_metrics, ApiError, CaptureError, CaptureFormat,
    Config, PageCapturer,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::handler::Handler;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const FALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Web Page Capture</title></head>
<body>
    <h1>Web Page Capture</h1>
    <p>The server is running.</p>
    <p>API check: <a href="/api/capture/health">/api/capture/health</a></p>
</body>
</html>
"#;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub capturer: Arc<dyn PageCapturer>,
    pub static_dir: Option<PathBuf>,
    pub metrics_enabled: bool,
    limiter: Option<Arc<Semaphore>>,
}

impl AppState {
    pub fn new(capturer: Arc<dyn PageCapturer>, config: &Config) -> Self {
        Self {
            capturer,
            static_dir: config.server.static_dir.clone(),
            metrics_enabled: config.metrics_enabled,
            limiter: config
                .max_concurrent_captures
                .map(|permits| Arc::new(Semaphore::new(permits))),
        }
    }
}

/// Body of `POST /api/capture`
#[derive(Debug, Default, Deserialize)]
pub struct CaptureRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

async fn capture_handler(
    State(state): State<AppState>,
    payload: Result<Json<CaptureRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let raw_url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::BadRequest("URL is required".to_string()))?;

    let url = normalize_url(raw_url)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid URL: {raw_url}")))?;
    let format = CaptureFormat::parse(request.format.as_deref());

    info!(url = %url, format = format.extension(), "Capture requested");

    let _permit = match &state.limiter {
        Some(limiter) => Some(
            limiter
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| CaptureError::BrowserLaunch(e.to_string()))?,
        ),
        None => None,
    };

    let capture = capture_page(state.capturer.as_ref(), url.as_str(), format).await?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", capture.filename),
            ),
        ],
        capture.data,
    )
        .into_response())
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(),
    )
}

/// Client-side routes fall through to the bundle's `index.html`.
async fn spa_index(State(static_dir): State<PathBuf>) -> Response {
    match tokio::fs::read(static_dir.join("index.html")).await {
        Ok(index) => Html(index).into_response(),
        Err(_) => Html(FALLBACK_PAGE).into_response(),
    }
}

async fn static_not_configured() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Static folder not configured")
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/capture", post(capture_handler))
        .merge(health::router());

    if state.metrics_enabled {
        router = router.route("/metrics", get(metrics_endpoint));
    }

    router = match state.static_dir.clone() {
        Some(static_dir) => router.fallback_service(
            ServeDir::new(&static_dir).fallback(spa_index.with_state(static_dir)),
        ),
        None => router.fallback(static_not_configured),
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve until SIGINT or SIGTERM.
pub async fn serve(config: &Config, capturer: Arc<dyn PageCapturer>) -> Result<(), CaptureError> {
    let host = config
        .server
        .host
        .parse()
        .map_err(|e| CaptureError::Config(format!("Invalid host {}: {e}", config.server.host)))?;
    let addr = SocketAddr::new(host, config.server.port);

    let app = build_router(AppState::new(capturer, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let sigint = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to create SIGINT handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to create SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = sigint => info!("Received SIGINT"),
        _ = sigterm => info!("Received SIGTERM"),
    }
}
