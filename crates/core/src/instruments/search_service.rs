//! Symbol search backed by the local store, falling back to the upstream.

use std::sync::Arc;

use log::{debug, info, warn};
use marketsync_market_data::CatalogProvider;

use super::instruments_model::{Instrument, InstrumentUpsert};
use super::instruments_traits::InstrumentRepositoryTrait;
use crate::constants::{
    DEFAULT_EXCHANGE, DEFAULT_INSTRUMENT_TYPE, LAZY_LOGO_LIMIT, SEARCH_KEY_PREFIX,
    SEARCH_RESULT_LIMIT,
};
use crate::errors::{Error, Result, ValidationError};
use crate::logos::LogoAcquisitionService;
use crate::sync::RequestCoalescer;

#[derive(Debug, Clone)]
pub struct InstrumentSearchConfig {
    pub instrument_type: String,
    /// Exchange recorded for upstream results that carry no MIC.
    pub exchange: String,
    pub result_limit: i64,
    /// How many image-less results get a logo acquired on the spot.
    pub lazy_logo_limit: usize,
}

impl Default for InstrumentSearchConfig {
    fn default() -> Self {
        Self {
            instrument_type: DEFAULT_INSTRUMENT_TYPE.to_string(),
            exchange: DEFAULT_EXCHANGE.to_string(),
            result_limit: SEARCH_RESULT_LIMIT,
            lazy_logo_limit: LAZY_LOGO_LIMIT,
        }
    }
}

pub struct InstrumentSearchService {
    provider: Arc<dyn CatalogProvider>,
    repository: Arc<dyn InstrumentRepositoryTrait>,
    logos: Option<Arc<LogoAcquisitionService>>,
    coalescer: RequestCoalescer<Vec<Instrument>>,
    config: InstrumentSearchConfig,
}

impl InstrumentSearchService {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        repository: Arc<dyn InstrumentRepositoryTrait>,
        config: InstrumentSearchConfig,
    ) -> Self {
        Self {
            provider,
            repository,
            logos: None,
            coalescer: RequestCoalescer::new(),
            config,
        }
    }

    /// Acquire logos for image-less results as part of each search.
    pub fn with_logo_acquisition(mut self, logos: Arc<LogoAcquisitionService>) -> Self {
        self.logos = Some(logos);
        self
    }

    /// Search instruments by symbol prefix or description.
    ///
    /// Local matches win. Without any, one upstream search per distinct query
    /// runs at a time; concurrent identical queries share its result.
    pub async fn search(&self, query: &str) -> Result<Vec<Instrument>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "query".to_string(),
            )));
        }

        let mut results = self.repository.search(query, self.config.result_limit)?;

        if results.is_empty() {
            let key = format!("{}{}", SEARCH_KEY_PREFIX, query.to_uppercase());
            let provider = Arc::clone(&self.provider);
            let repository = Arc::clone(&self.repository);
            let config = self.config.clone();
            let query = query.to_string();

            results = self
                .coalescer
                .execute(&key, move || {
                    search_upstream(provider, repository, config, query)
                })
                .await?;
        }

        self.attach_logos(&mut results).await;
        Ok(results)
    }

    async fn attach_logos(&self, results: &mut [Instrument]) {
        let Some(logos) = &self.logos else {
            return;
        };

        for instrument in results
            .iter_mut()
            .filter(|i| i.image_ref.is_none())
            .take(self.config.lazy_logo_limit)
        {
            match logos.acquire(&instrument.symbol).await {
                Ok(Some(image_ref)) => {
                    if let Err(e) = self
                        .repository
                        .set_image_ref(instrument.symbol.clone(), image_ref.clone())
                        .await
                    {
                        warn!("Failed to store logo for {}: {}", instrument.symbol, e);
                    }
                    instrument.image_ref = Some(image_ref);
                }
                Ok(None) => debug!("No logo found for {}", instrument.symbol),
                Err(e) => warn!("Logo acquisition failed for {}: {}", instrument.symbol, e),
            }
        }
    }
}

async fn search_upstream(
    provider: Arc<dyn CatalogProvider>,
    repository: Arc<dyn InstrumentRepositoryTrait>,
    config: InstrumentSearchConfig,
    query: String,
) -> Result<Vec<Instrument>> {
    let listings = provider.search_symbols(&query).await?;

    let mut stored = Vec::new();
    for listing in listings
        .iter()
        .filter(|listing| listing.instrument_type == config.instrument_type)
    {
        let upsert = InstrumentUpsert::from_listing(listing, &config.exchange);
        if upsert.symbol.is_empty() {
            continue;
        }

        let symbol = upsert.symbol.clone();
        match repository.upsert_by_symbol(upsert).await {
            Ok(instrument) => stored.push(instrument),
            Err(e) => warn!("Search: failed to store {}: {}", symbol, e),
        }

        if stored.len() as i64 >= config.result_limit {
            break;
        }
    }

    info!(
        "Upstream search '{}' stored {} of {} results",
        query,
        stored.len(),
        listings.len()
    );

    Ok(stored)
}
