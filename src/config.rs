//! Configuration management with serde serialization/deserialization
//!
//! This module provides the configuration structures for the capture service,
//! including the browser viewport, the navigation wait policy, and the HTTP
//! server settings.

use crate::CaptureError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// User agent presented to captured sites unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Main configuration structure for the capture service
///
/// # Examples
///
/// ```rust
/// use page_capture::Config;
///
/// let config = Config {
///     max_concurrent_captures: Some(4),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Browser viewport used for rendering (default: 1920x1080)
    pub viewport: Viewport,

    /// How long to wait for a page to look loaded
    pub navigation: NavigationPolicy,

    /// HTTP listener and static bundle settings
    pub server: ServerSettings,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// User-Agent string sent by the headless browser
    pub user_agent: String,

    /// Upper bound on simultaneous browser sessions (default: unbounded)
    ///
    /// Every capture launches its own browser process. When set, requests
    /// beyond this bound wait for a running capture to finish.
    pub max_concurrent_captures: Option<usize>,

    /// Expose Prometheus metrics at `/metrics` (default: true)
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            navigation: NavigationPolicy::default(),
            server: ServerSettings::default(),
            chrome_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent_captures: None,
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Reject settings that would make every capture fail.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(CaptureError::Config(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }

        if self.navigation.dom_ready_timeout.is_zero() {
            return Err(CaptureError::Config(
                "DOM ready timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(CaptureError::Config(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_captures == Some(0) {
            return Err(CaptureError::Config(
                "Max concurrent captures must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Browser viewport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1920)
    pub width: u32,

    /// Viewport height in pixels (default: 1080)
    pub height: u32,

    /// Device pixel ratio (default: 1.0)
    pub device_scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
        }
    }
}

/// Best-effort heuristic for "the page looks loaded"
///
/// Navigation first waits for the DOM to be ready (hard bound), then sleeps
/// for `settle_delay`, then optionally waits for network quiescence. The
/// network wait is allowed to time out silently.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationPolicy {
    /// Bound on the DOM-ready wait; exceeding it fails the capture (default: 60s)
    pub dom_ready_timeout: Duration,

    /// Fixed delay after DOM ready (default: 3s)
    pub settle_delay: Duration,

    /// Wait for the network to go idle before capturing (default: true)
    pub wait_for_network_idle: bool,

    /// Bound on the network idle wait (default: 10s)
    pub network_idle_timeout: Duration,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            dom_ready_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_secs(3),
            wait_for_network_idle: true,
            network_idle_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,

    /// Directory holding the single-page application bundle
    ///
    /// `None` disables static serving entirely.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            static_dir: Some(PathBuf::from("static")),
        }
    }
}

/// Chrome command-line arguments for a headless capture session
///
/// # Examples
///
/// ```rust
/// use page_capture::{Config, get_chrome_args};
///
/// let args = get_chrome_args(&Config::default());
/// assert!(args.contains(&"--no-sandbox".to_string()));
/// ```
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-accelerated-2d-canvas".to_string(),
        "--no-first-run".to_string(),
        "--no-zygote".to_string(),
        "--disable-gpu".to_string(),
        "--disable-web-security".to_string(),
        "--disable-features=VizDisplayCompositor".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
    ]
}

/// chromiumoxide's own per-command default
const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single DevTools command
///
/// Navigation only resolves once the response commits, so a command must be
/// allowed to run for the whole DOM-ready bound.
pub fn browser_request_timeout(config: &Config) -> Duration {
    config.navigation.dom_ready_timeout.max(CDP_REQUEST_TIMEOUT)
}

/// Build the chromiumoxide launch configuration for one session
///
/// `user_data_dir` must be unique per session so concurrent browsers do not
/// fight over the profile lock.
pub fn create_browser_config(
    config: &Config,
    user_data_dir: &std::path::Path,
) -> Result<chromiumoxide::browser::BrowserConfig, CaptureError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .user_data_dir(user_data_dir)
        .request_timeout(browser_request_timeout(config))
        .args(get_chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CaptureError::BrowserLaunch)
}
