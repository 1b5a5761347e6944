//! Bulk catalog synchronization.
//!
//! Fetches the full upstream listing (with exponential-backoff retries),
//! keeps the configured instrument type, and upserts each record by its
//! canonical symbol. A failing record is counted and recorded; it never
//! aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use marketsync_market_data::CatalogProvider;
use serde::{Deserialize, Serialize};

use super::instruments_model::InstrumentUpsert;
use super::instruments_traits::InstrumentRepositoryTrait;
use crate::constants::{
    CATALOG_FETCH_BASE_DELAY, CATALOG_FETCH_MAX_RETRIES, DEFAULT_EXCHANGE, DEFAULT_INSTRUMENT_TYPE,
};
use crate::errors::{Error, Result, ValidationError};
use crate::sync::RetryExecutor;

#[derive(Debug, Clone)]
pub struct CatalogSyncConfig {
    /// Exchange filter passed to the upstream listing.
    pub exchange: String,
    /// Only listings whose type tag equals this exactly are kept.
    pub instrument_type: String,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for CatalogSyncConfig {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            instrument_type: DEFAULT_INSTRUMENT_TYPE.to_string(),
            max_retries: CATALOG_FETCH_MAX_RETRIES,
            base_delay: CATALOG_FETCH_BASE_DELAY,
        }
    }
}

/// A record that could not be upserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSyncError {
    pub symbol: String,
    pub error: String,
}

/// Summary of one catalog sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSyncResult {
    /// Listings of the target type returned by the upstream.
    pub fetched: usize,
    pub upserted: usize,
    pub failed: usize,
    pub errors: Vec<CatalogSyncError>,
}

impl CatalogSyncResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record_failure(&mut self, symbol: String, error: &Error) {
        self.failed += 1;
        self.errors.push(CatalogSyncError {
            symbol,
            error: error.to_string(),
        });
    }
}

/// Service that reconciles the local instrument store with the upstream catalog.
pub struct CatalogSyncService {
    provider: Arc<dyn CatalogProvider>,
    repository: Arc<dyn InstrumentRepositoryTrait>,
    config: CatalogSyncConfig,
    retry: RetryExecutor,
}

impl CatalogSyncService {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        repository: Arc<dyn InstrumentRepositoryTrait>,
        config: CatalogSyncConfig,
    ) -> Self {
        let retry = RetryExecutor::new(config.max_retries, config.base_delay);
        Self {
            provider,
            repository,
            config,
            retry,
        }
    }

    /// Run one full catalog sync.
    ///
    /// Only the initial fetch can fail the call, and only after every retry
    /// is spent. Per-record failures land in the returned summary.
    pub async fn sync_catalog(&self) -> Result<CatalogSyncResult> {
        let exchange = self.config.exchange.as_str();
        let label = format!("{} catalog fetch ({})", self.provider.id(), exchange);

        let listings = self
            .retry
            .run(&label, || self.provider.fetch_symbols(exchange))
            .await
            .map_err(|e| {
                error!("{} failed after {} retries: {}", label, self.retry.max_retries(), e);
                Error::MarketData(e)
            })?;

        let total_listed = listings.len();
        let candidates: Vec<InstrumentUpsert> = listings
            .iter()
            .filter(|listing| listing.instrument_type == self.config.instrument_type)
            .map(|listing| InstrumentUpsert::from_listing(listing, exchange))
            .collect();

        info!(
            "Catalog sync: {} of {} listings match type '{}'",
            candidates.len(),
            total_listed,
            self.config.instrument_type
        );

        let mut result = CatalogSyncResult {
            fetched: candidates.len(),
            ..Default::default()
        };

        for upsert in candidates {
            let symbol = upsert.symbol.clone();

            if symbol.is_empty() {
                let e = Error::Validation(ValidationError::MissingField("symbol".to_string()));
                warn!("Catalog sync: skipping listing without a symbol");
                result.record_failure(symbol, &e);
                continue;
            }

            match self.repository.upsert_by_symbol(upsert).await {
                Ok(_) => {
                    debug!("Catalog sync: upserted {}", symbol);
                    result.upserted += 1;
                }
                Err(e) => {
                    warn!("Catalog sync: failed to upsert {}: {}", symbol, e);
                    result.record_failure(symbol, &e);
                }
            }
        }

        info!(
            "Catalog sync finished: fetched={}, upserted={}, failed={}",
            result.fetched, result.upserted, result.failed
        );

        Ok(result)
    }
}
