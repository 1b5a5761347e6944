use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use log::{debug, info};
use marketsync_core::constants::BROWSER_TIMEOUT;
use marketsync_core::logos::{BrowserLauncher, BrowserSession, Viewport};
use marketsync_core::{Error, Result};

use crate::errors::browser_error;
use crate::session::ChromiumSession;

/// Launch options for the headless browser.
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Overrides Chromium discovery on the host.
    pub executable: Option<PathBuf>,
    /// Upper bound on any single DevTools request.
    pub request_timeout: Duration,
    pub window: Viewport,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            executable: None,
            request_timeout: BROWSER_TIMEOUT,
            window: Viewport::default(),
        }
    }
}

impl ChromiumConfig {
    pub(crate) fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.window.width, self.window.height)
            .viewport(None)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .request_timeout(self.request_timeout);

        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|e| Error::Browser(format!("Invalid browser configuration: {}", e)))
    }
}

/// Starts headless Chromium processes.
pub struct ChromiumLauncher {
    config: ChromiumConfig,
}

impl ChromiumLauncher {
    pub fn new(config: ChromiumConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>> {
        let (browser, mut handler) = Browser::launch(self.config.browser_config()?)
            .await
            .map_err(|e| browser_error("Failed to launch browser", e))?;

        // The DevTools connection only makes progress while its handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
            debug!("Browser handler stopped");
        });

        info!("Headless browser launched");
        Ok(Arc::new(ChromiumSession::new(browser, handler_task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChromiumConfig::default();
        assert_eq!(config.window, Viewport::default());
        assert_eq!(config.request_timeout, BROWSER_TIMEOUT);
        assert!(config.executable.is_none());
    }

    #[test]
    fn test_builds_browser_config_with_executable_override() {
        let config = ChromiumConfig {
            executable: Some(PathBuf::from("/usr/bin/chromium")),
            ..Default::default()
        };
        assert!(config.browser_config().is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires a local Chromium
    async fn test_launch_and_evaluate() {
        let launcher = ChromiumLauncher::new(ChromiumConfig::default());
        let session = launcher.launch().await.unwrap();
        assert!(session.is_connected().await);

        let page = session.new_page(Viewport::default()).await.unwrap();
        let value = page.evaluate("1 + 2").await.unwrap();
        assert_eq!(value, serde_json::json!(3));
        let nothing = page.evaluate("null").await.unwrap();
        assert!(nothing.is_null());

        page.close().await.unwrap();
        page.close().await.unwrap();
        session.close().await.unwrap();
    }
}
