use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A bounded wait expired; the first field names the phase
    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, Duration),

    #[error("Screenshot capture failed: {0}")]
    Screenshot(String),

    #[error("Image decoding failed: {0}")]
    Image(String),

    #[error("PDF assembly failed: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::Image(err.to_string())
    }
}

impl From<lopdf::Error> for CaptureError {
    fn from(err: lopdf::Error) -> Self {
        CaptureError::Document(err.to_string())
    }
}

/// Errors surfaced by the HTTP layer
///
/// Everything collapses to two categories: bad client input (400) and a
/// failed capture (500). The body is always `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Capture(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "capture request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
