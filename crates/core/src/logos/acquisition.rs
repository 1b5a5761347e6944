//! Logo acquisition: cache, else one coalesced scrape per symbol.
//!
//! Each call walks a small state machine:
//!
//! ```text
//! start --cached--> CacheHit --> Done(Some)
//!   |
//!   +--another caller scraping--> Coalesced --> Done(..)
//!   +--first caller-------------> Scraping  --> Done(..)
//! ```
//!
//! A miss (nothing found, download failed) ends in `Done(None)`; it is not
//! an error. Errors are reserved for bad input and for a browser that cannot
//! be reached at all.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use super::browser::PageHandle;
use super::cache::{is_valid_file_stem, LogoCache};
use super::download::ImageDownloader;
use super::extract::{extraction_script, normalize_source, Candidate};
use super::session::SessionManager;
use crate::constants::{ACQUIRE_KEY_PREFIX, BROWSER_TIMEOUT, IMAGE_SEARCH_URL, PAGE_SETTLE_DELAY};
use crate::errors::{Error, Result, ValidationError};
use crate::instruments::normalize_symbol;
use crate::sync::{Participation, RequestCoalescer};

#[derive(Debug, Clone)]
pub struct LogoConfig {
    pub navigation_timeout: Duration,
    /// Pause after navigation for dynamic results to render.
    pub settle_delay: Duration,
    pub search_url: String,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: BROWSER_TIMEOUT,
            settle_delay: PAGE_SETTLE_DELAY,
            search_url: IMAGE_SEARCH_URL.to_string(),
        }
    }
}

/// States one acquisition passes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "imageRef", rename_all = "camelCase")]
pub enum AcquisitionState {
    CacheHit,
    Coalesced,
    Scraping,
    Done(Option<String>),
}

/// The path an acquisition took, ending in `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionTrace {
    pub symbol: String,
    pub states: Vec<AcquisitionState>,
}

impl AcquisitionTrace {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            states: Vec::with_capacity(2),
        }
    }

    fn enter(&mut self, state: AcquisitionState) {
        debug!("Logo acquisition {}: {:?}", self.symbol, state);
        self.states.push(state);
    }

    pub fn image_ref(&self) -> Option<&str> {
        match self.states.last() {
            Some(AcquisitionState::Done(image_ref)) => image_ref.as_deref(),
            _ => None,
        }
    }

    pub fn into_image_ref(self) -> Option<String> {
        match self.states.into_iter().last() {
            Some(AcquisitionState::Done(image_ref)) => image_ref,
            _ => None,
        }
    }
}

/// A page borrowed from the session for one scrape.
///
/// `release` closes it in place. A lease dropped without release (the task
/// was cancelled mid-await) hands the page to a spawned task to close.
pub(super) struct PageLease {
    session: Arc<SessionManager>,
    page: Option<Box<dyn PageHandle>>,
}

impl PageLease {
    pub(super) async fn open(session: &Arc<SessionManager>) -> Result<Self> {
        let page = session.create_handle().await?;
        Ok(Self {
            session: Arc::clone(session),
            page: Some(page),
        })
    }

    pub(super) fn page(&self) -> Result<&dyn PageHandle> {
        self.page
            .as_deref()
            .ok_or_else(|| Error::Browser("page already released".to_string()))
    }

    pub(super) async fn release(mut self) {
        if let Some(page) = self.page.take() {
            self.session.release_handle(page).await;
        }
    }
}

impl Drop for PageLease {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        let session = Arc::clone(&self.session);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { session.release_handle(page).await });
            }
            Err(_) => warn!("Browser page dropped outside a runtime, left open"),
        }
    }
}

/// Pieces a scrape needs, cloned into the coalesced task.
#[derive(Clone)]
struct Scraper {
    session: Arc<SessionManager>,
    cache: LogoCache,
    downloader: ImageDownloader,
    config: LogoConfig,
}

pub struct LogoAcquisitionService {
    scraper: Scraper,
    coalescer: RequestCoalescer<Option<String>>,
}

impl LogoAcquisitionService {
    pub fn new(session: Arc<SessionManager>, cache: LogoCache, config: LogoConfig) -> Self {
        Self {
            scraper: Scraper {
                session,
                cache,
                downloader: ImageDownloader::new(),
                config,
            },
            coalescer: RequestCoalescer::new(),
        }
    }

    pub fn with_downloader(mut self, downloader: ImageDownloader) -> Self {
        self.scraper.downloader = downloader;
        self
    }

    /// Image reference for `symbol`, or `None` when no logo could be found.
    pub async fn acquire(&self, symbol: &str) -> Result<Option<String>> {
        Ok(self.acquire_traced(symbol).await?.into_image_ref())
    }

    /// Like [`acquire`](Self::acquire), returning every state the call went through.
    pub async fn acquire_traced(&self, symbol: &str) -> Result<AcquisitionTrace> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }
        if !is_valid_file_stem(&symbol) {
            return Err(ValidationError::InvalidInput(format!(
                "symbol '{}' contains path or control characters",
                symbol
            ))
            .into());
        }

        let mut trace = AcquisitionTrace::new(&symbol);

        if let Some(image_ref) = self.scraper.cache.lookup(&symbol).await {
            trace.enter(AcquisitionState::CacheHit);
            trace.enter(AcquisitionState::Done(Some(image_ref)));
            return Ok(trace);
        }

        let key = format!("{}{}", ACQUIRE_KEY_PREFIX, symbol);
        let scraper = self.scraper.clone();
        let owned_symbol = symbol.clone();

        let (participation, outcome) = self
            .coalescer
            .execute_observed(&key, move || async move { scraper.run(&owned_symbol).await })
            .await;

        trace.enter(match participation {
            Participation::Leader => AcquisitionState::Scraping,
            Participation::Follower => AcquisitionState::Coalesced,
        });
        trace.enter(AcquisitionState::Done(outcome?));

        Ok(trace)
    }

    /// Keys with a scrape still running.
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight_count()
    }
}

impl Scraper {
    async fn run(&self, symbol: &str) -> Result<Option<String>> {
        // A scrape that finished just before we got the key may have filled the cache.
        if let Some(image_ref) = self.cache.lookup(symbol).await {
            return Ok(Some(image_ref));
        }

        let lease = PageLease::open(&self.session).await?;
        let found = match lease.page() {
            Ok(page) => self.search_page(page, symbol).await,
            Err(e) => Err(e),
        };
        lease.release().await;

        let Some(source) = found? else {
            info!("No logo candidate found for {}", symbol);
            return Ok(None);
        };

        match self.downloader.download(&source, &self.cache, symbol).await {
            Ok(file_name) => {
                let image_ref = self.cache.public_ref(&file_name);
                info!("Acquired logo for {}: {}", symbol, image_ref);
                Ok(Some(image_ref))
            }
            Err(e) => {
                warn!("Logo download failed for {}: {}", symbol, e);
                Ok(None)
            }
        }
    }

    /// Navigate, let the page settle, extract and normalize the image source.
    async fn search_page(&self, page: &dyn PageHandle, symbol: &str) -> Result<Option<String>> {
        let url = self.search_url(symbol);
        let timeout = self.config.navigation_timeout;

        tokio::time::timeout(timeout, page.goto(&url))
            .await
            .map_err(|_| Error::Timeout(format!("navigation to image search for {}", symbol)))??;

        tokio::time::sleep(self.config.settle_delay).await;

        let value = tokio::time::timeout(timeout, page.evaluate(&extraction_script()))
            .await
            .map_err(|_| Error::Timeout(format!("image extraction for {}", symbol)))??;

        Ok(Candidate::from_value(value)
            .and_then(|candidate| candidate.resolve_source())
            .and_then(|raw| normalize_source(&raw, &url)))
    }

    fn search_url(&self, symbol: &str) -> String {
        let query = format!("{} stock logo", symbol);
        format!(
            "{}?tbm=isch&q={}",
            self.config.search_url,
            urlencoding::encode(&query)
        )
    }
}
