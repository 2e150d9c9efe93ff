//! Disposable headless Chrome sessions
//!
//! Every capture launches its own browser process and tears it down again
//! before the request completes. Nothing is pooled or shared between requests.

use crate::{create_browser_config, CaptureError, Config};
use chromiumoxide::browser::Browser;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How long a closed browser gets to exit before it is killed
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// One running Chrome process plus the task pumping its DevTools connection
///
/// Dropping a session without [`BrowserSession::close`] (a cancelled request)
/// still kills the process and removes its profile directory. Fields drop in
/// order, so the browser goes before its directory.
pub struct BrowserSession {
    pub id: String,
    browser: Browser,
    handler: JoinHandle<Result<(), CdpError>>,
    user_data_dir: TempDir,
}

impl BrowserSession {
    pub async fn launch(config: &Config) -> Result<Self, CaptureError> {
        let id = uuid::Uuid::new_v4().to_string();
        let user_data_dir = create_user_data_dir(&id).map_err(|e| {
            CaptureError::BrowserLaunch(format!("Failed to create user data dir: {e}"))
        })?;

        let browser_config = create_browser_config(config, user_data_dir.path())?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::BrowserLaunch(e.to_string()))?;

        // The handler is a Stream that must be polled for the browser to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Handler error: {}", e);
                    return Err(e);
                }
            }
            Ok(())
        });

        info!(session = %id, "Browser session launched");

        Ok(Self {
            id,
            browser,
            handler,
            user_data_dir,
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser and release everything the session created.
    ///
    /// Teardown failures are logged, never returned: the capture outcome has
    /// already been decided by the time this runs.
    pub async fn close(mut self) {
        let exited = match self.browser.close().await {
            Ok(_) => match timeout(CLOSE_TIMEOUT, self.browser.wait()).await {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    debug!(session = %self.id, "Failed to reap browser process: {}", e);
                    false
                }
                Err(_) => {
                    warn!(session = %self.id, "Browser still running after {:?}", CLOSE_TIMEOUT);
                    false
                }
            },
            Err(e) => {
                warn!(session = %self.id, "Failed to close browser: {}", e);
                false
            }
        };

        if !exited {
            if let Some(Err(e)) = self.browser.kill().await {
                warn!(session = %self.id, "Failed to kill browser: {}", e);
            }
        }

        self.handler.abort();

        let dir = self.user_data_dir.path().to_path_buf();
        if let Err(e) = self.user_data_dir.close() {
            debug!("Failed to remove {}: {}", dir.display(), e);
        }

        info!(session = %self.id, "Browser session closed");
    }
}

fn create_user_data_dir(id: &str) -> std::io::Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("page-capture-{id}-"))
        .tempdir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_dir_is_unique_per_session() {
        let first = create_user_data_dir("a").unwrap();
        let second = create_user_data_dir("a").unwrap();

        assert_ne!(first.path(), second.path());
        let name = first.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("page-capture-a-"));
    }

    #[test]
    fn test_user_data_dir_removed_on_drop() {
        let dir = create_user_data_dir("dropped").unwrap();
        let path = dir.path().to_path_buf();
        std::fs::write(path.join("Local State"), "{}").unwrap();
        assert!(path.exists());

        drop(dir);
        assert!(!path.exists());
    }
}
