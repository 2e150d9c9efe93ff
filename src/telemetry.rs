//! Capture metrics and Prometheus export
//!
//! Metrics go through the `metrics` facade. Until [`init_metrics`] installs
//! the Prometheus recorder they are silently dropped, which is what tests and
//! the one-shot CLI rely on.

use crate::CaptureFormat;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if METRICS_HANDLE.set(handle).is_ok() {
                info!("Prometheus recorder installed");
            }
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Current metrics in Prometheus text format
pub fn render_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_capture(format: CaptureFormat, duration: Duration, success: bool) {
    let outcome = if success { "success" } else { "failure" };

    metrics::counter!(
        "captures_total",
        "format" => format.extension(),
        "outcome" => outcome
    )
    .increment(1);

    metrics::histogram!("capture_duration_seconds", "format" => format.extension())
        .record(duration.as_secs_f64());
}
