//! Browser seams. The core drives a headless browser only through these
//! traits; the Chromium implementation lives in its own crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
        }
    }
}

/// Starts a new browser process.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>>;
}

/// A running browser shared by many short-lived pages.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Cheap liveness probe. A `false` makes the manager relaunch.
    async fn is_connected(&self) -> bool;
    async fn new_page(&self, viewport: Viewport) -> Result<Box<dyn PageHandle>>;
    async fn close(&self) -> Result<()>;
}

/// One isolated tab, owned by a single operation.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;
    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
    /// Must tolerate being called on an already closed page.
    async fn close(&self) -> Result<()>;
}
