use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chromiumoxide::Page;
use log::debug;
use marketsync_core::logos::PageHandle;
use marketsync_core::Result;

use crate::errors::browser_error;

/// One browser tab. Closing is idempotent.
pub struct ChromiumPage {
    page: Page,
    closed: AtomicBool,
}

impl ChromiumPage {
    pub(crate) fn new(page: Page) -> Self {
        Self {
            page,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| browser_error("Navigation failed", e))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| browser_error("Script evaluation failed", e))?;

        // A script returning null or undefined carries no value
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("Closing page");
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| browser_error("Failed to close page", e))
    }
}
