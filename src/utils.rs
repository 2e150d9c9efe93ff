use crate::CaptureFormat;
use chrono::{DateTime, TimeZone};
use std::time::Duration;
use url::Url;

/// Default a scheme-less target to HTTPS and check that it parses.
///
/// Returns `None` when nothing usable remains.
pub fn normalize_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate).ok()?;
    parsed.host_str()?;
    Some(parsed)
}

/// `webpage_capture_YYYYMMDD_HHMMSS.<ext>`
pub fn capture_filename<Tz: TimeZone>(format: CaptureFormat, at: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "webpage_capture_{}.{}",
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{}.{}s", seconds, millis / 100)
    } else {
        format!("{millis}ms")
    }
}

pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
