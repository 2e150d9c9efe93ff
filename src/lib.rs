//! # Page Capture
//!
//! A small HTTP service that renders a web page in headless Chrome, takes a
//! full-page screenshot, and hands it back as a PNG download or as a
//! single-page PDF sized to the image.
//!
//! Every request launches its own browser and tears it down before the
//! response is sent. Nothing is pooled, queued, cached or retried.
//!
//! ## HTTP API
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/api/capture` | POST `{"url": "...", "format": "png"\|"pdf"}` | attachment or `{"error": "..."}` |
//! | `/health`, `/api/health`, `/api/capture/health` | GET | `{"status": "healthy", ...}` |
//! | `/api/users` | GET | static placeholder |
//! | `/metrics` | GET | Prometheus text format |
//! | anything else | GET | SPA bundle, `index.html`, or a fallback page |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use page_capture::{capture_page, CaptureFormat, CaptureService, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = CaptureService::new(Config::default());
//!     let capture = capture_page(&service, "https://example.com", CaptureFormat::Pdf).await?;
//!     std::fs::write(&capture.filename, &capture.data)?;
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! page-capture serve --port 5001 --static-dir static
//! page-capture capture --url example.com --format pdf --output example.pdf
//! ```

/// Configuration and settings
pub mod config;

/// Error types and their HTTP mapping
pub mod error;

/// Disposable headless Chrome sessions
pub mod browser_session;

/// Navigation, screenshot, and artifact encoding
pub mod capture_service;

/// Screenshot to PDF conversion
pub mod document;

/// HTTP routes and server loop
pub mod server;

/// Liveness probes
pub mod health;

/// Command-line interface implementation
pub mod cli;

/// Metrics recording and Prometheus export
pub mod telemetry;

/// Utility functions and helpers
pub mod utils;

#[cfg(test)]
mod tests;

pub use browser_session::*;
pub use capture_service::*;
pub use cli::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use health::HealthResponse;
pub use server::*;
pub use telemetry::*;
pub use utils::*;
