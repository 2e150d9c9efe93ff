//! Page capture pipeline
//!
//! [`CaptureService`] renders one URL in a fresh headless browser and returns
//! a full-page PNG. [`capture_page`] wraps any [`PageCapturer`] and turns the
//! screenshot into the artifact a client downloads (PNG as-is, or a one-page
//! PDF).

use crate::{
    capture_filename, format_bytes, format_duration, png_to_pdf, record_capture, BrowserSession,
    CaptureError, Config, NavigationPolicy,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{LoaderId, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, FrameId, NavigateParams,
    SetLifecycleEventsEnabledParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Renders a URL and returns the full-page screenshot as PNG bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageCapturer: Send + Sync {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, CaptureError>;
}

/// Output selector for a capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFormat {
    #[default]
    Png,
    Pdf,
}

impl CaptureFormat {
    /// Anything other than a case-insensitive `pdf` means PNG.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("pdf") => CaptureFormat::Pdf,
            _ => CaptureFormat::Png,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "image/png",
            CaptureFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Pdf => "pdf",
        }
    }
}

/// A finished capture, ready to be sent or written to disk
#[derive(Debug)]
pub struct Capture {
    pub url: String,
    pub format: CaptureFormat,
    pub data: Vec<u8>,
    pub filename: String,
    pub duration: Duration,
}

/// Capture `url` with `capturer` and encode the result as `format`.
///
/// No retry: the first error from the browser or the PDF writer is returned.
pub async fn capture_page(
    capturer: &dyn PageCapturer,
    url: &str,
    format: CaptureFormat,
) -> Result<Capture, CaptureError> {
    let start_time = Instant::now();
    let result = encode_capture(capturer, url, format).await;
    let duration = start_time.elapsed();

    record_capture(format, duration, result.is_ok());

    let data = result?;
    info!(
        url,
        format = format.extension(),
        "Captured {} in {}",
        format_bytes(data.len()),
        format_duration(duration)
    );

    Ok(Capture {
        url: url.to_string(),
        format,
        data,
        filename: capture_filename(format, chrono::Local::now()),
        duration,
    })
}

async fn encode_capture(
    capturer: &dyn PageCapturer,
    url: &str,
    format: CaptureFormat,
) -> Result<Vec<u8>, CaptureError> {
    let png_data = capturer.capture(url).await?;

    match format {
        CaptureFormat::Png => Ok(png_data),
        CaptureFormat::Pdf => tokio::task::spawn_blocking(move || png_to_pdf(&png_data))
            .await
            .map_err(|e| CaptureError::Document(e.to_string()))?,
    }
}

/// Production [`PageCapturer`] backed by one disposable Chrome per call
///
/// # Examples
///
/// ```rust,no_run
/// use page_capture::{CaptureService, Config, PageCapturer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = CaptureService::new(Config::default());
///     let png = service.capture("https://example.com").await?;
///     println!("Captured {} bytes", png.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CaptureService {
    config: Config,
}

impl CaptureService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    async fn render(&self, session: &BrowserSession, url: &str) -> Result<Vec<u8>, CaptureError> {
        let page = session
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::BrowserLaunch(e.to_string()))?;

        let result = self.render_page(&page, url).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        result
    }

    async fn render_page(&self, page: &Page, url: &str) -> Result<Vec<u8>, CaptureError> {
        self.prepare_page(page).await?;

        // Subscribe before navigating so no lifecycle event is missed
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;

        let navigate = async {
            let navigation = page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| CaptureError::Navigation(e.to_string()))?;

            if let Some(error_text) = &navigation.result.error_text {
                return Err(CaptureError::Navigation(format!("{url}: {error_text}")));
            }

            Ok::<_, CaptureError>(NavigationTarget {
                frame_id: navigation.result.frame_id.clone(),
                loader_id: navigation.result.loader_id.clone(),
            })
        };

        wait_until_loaded(&mut lifecycle, navigate, &self.config.navigation).await?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        page.screenshot(params)
            .await
            .map_err(|e| CaptureError::Screenshot(e.to_string()))
    }

    async fn prepare_page(&self, page: &Page) -> Result<(), CaptureError> {
        let viewport = &self.config.viewport;

        let emulation_params = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width)
            .height(viewport.height)
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(false)
            .build()
            .map_err(CaptureError::Navigation)?;

        page.execute(emulation_params)
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;

        page.execute(SetUserAgentOverrideParams::new(self.config.user_agent.clone()))
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl PageCapturer for CaptureService {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, CaptureError> {
        let session = BrowserSession::launch(&self.config).await?;
        let result = self.render(&session, url).await;
        session.close().await;
        result
    }
}

struct NavigationTarget {
    frame_id: FrameId,
    loader_id: Option<LoaderId>,
}

impl NavigationTarget {
    fn matches(&self, event: &EventLifecycleEvent) -> bool {
        event.frame_id == self.frame_id
            && self
                .loader_id
                .as_ref()
                .map_or(true, |loader_id| &event.loader_id == loader_id)
    }
}

/// Navigate and wait for the DOM to be ready (one bound, fatal), then a fixed
/// settle delay, then network idle (bounded, non-fatal).
async fn wait_until_loaded<S, N>(
    lifecycle: &mut S,
    navigate: N,
    policy: &NavigationPolicy,
) -> Result<(), CaptureError>
where
    S: Stream<Item = Arc<EventLifecycleEvent>> + Unpin,
    N: Future<Output = Result<NavigationTarget, CaptureError>>,
{
    let target = timeout(policy.dom_ready_timeout, async {
        let target = navigate.await?;
        wait_for_lifecycle(lifecycle, &target, "DOMContentLoaded").await?;
        Ok::<_, CaptureError>(target)
    })
    .await
    .map_err(|_| CaptureError::Timeout("DOM ready", policy.dom_ready_timeout))??;

    sleep(policy.settle_delay).await;

    if policy.wait_for_network_idle {
        match timeout(
            policy.network_idle_timeout,
            wait_for_lifecycle(lifecycle, &target, "networkIdle"),
        )
        .await
        {
            Ok(Ok(())) => debug!("Network idle reached"),
            Ok(Err(e)) => warn!("Network idle wait failed, capturing anyway: {}", e),
            Err(_) => warn!(
                "Network not idle after {}, capturing anyway",
                format_duration(policy.network_idle_timeout)
            ),
        }
    }

    Ok(())
}

async fn wait_for_lifecycle<S>(
    lifecycle: &mut S,
    target: &NavigationTarget,
    name: &str,
) -> Result<(), CaptureError>
where
    S: Stream<Item = Arc<EventLifecycleEvent>> + Unpin,
{
    while let Some(event) = lifecycle.next().await {
        if event.name == name && target.matches(&event) {
            return Ok(());
        }
    }

    Err(CaptureError::Navigation(format!("page went away before {name}")))
}
