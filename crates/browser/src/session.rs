use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use log::{debug, warn};
use marketsync_core::logos::{BrowserSession, PageHandle, Viewport};
use marketsync_core::Result;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::errors::browser_error;
use crate::page::ChromiumPage;

/// One running Chromium process.
pub struct ChromiumSession {
    browser: RwLock<Browser>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumSession {
    pub(crate) fn new(browser: Browser, handler_task: JoinHandle<()>) -> Self {
        Self {
            browser: RwLock::new(browser),
            handler_task: Mutex::new(Some(handler_task)),
        }
    }

    fn stop_handler(&self) {
        let task = self
            .handler_task
            .lock()
            .unwrap_or_else(|poisoned| {
                warn!("Browser handler lock poisoned, recovering");
                poisoned.into_inner()
            })
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn is_connected(&self) -> bool {
        match self.browser.read().await.version().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Browser liveness probe failed: {}", e);
                false
            }
        }
    }

    async fn new_page(&self, viewport: Viewport) -> Result<Box<dyn PageHandle>> {
        let page = self
            .browser
            .read()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| browser_error("Failed to open page", e))?;

        let metrics = SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            1.0,
            false,
        );
        if let Err(e) = page.execute(metrics).await {
            let _ = page.close().await;
            return Err(browser_error("Failed to set viewport", e));
        }

        Ok(Box::new(ChromiumPage::new(page)))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.write().await;
        let closed = browser
            .close()
            .await
            .map_err(|e| browser_error("Failed to close browser", e));
        if let Err(e) = browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        self.stop_handler();
        closed.map(|_| ())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.stop_handler();
    }
}
