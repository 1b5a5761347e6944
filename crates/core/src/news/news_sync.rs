//! Rate-limited news synchronization.
//!
//! The tracked instrument set is recomputed at the start of every run. Each
//! instrument is then processed strictly one after another with a fixed
//! pause between upstream calls. The pause also follows failed calls, so the
//! request rate stays under the upstream quota whatever the mix of outcomes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use marketsync_market_data::NewsProvider;
use serde::{Deserialize, Serialize};

use super::news_model::NewNewsArticle;
use super::news_traits::NewsRepositoryTrait;
use super::relevance::RelevanceClassifier;
use crate::constants::NEWS_INTER_CALL_DELAY;
use crate::errors::Result;
use crate::instruments::Instrument;
use crate::sync::Throttle;
use crate::watchlists::WatchlistRepositoryTrait;

#[derive(Debug, Clone)]
pub struct NewsSyncConfig {
    /// Pause between per-instrument upstream calls.
    pub inter_call_delay: Duration,
}

impl Default for NewsSyncConfig {
    fn default() -> Self {
        Self {
            inter_call_delay: NEWS_INTER_CALL_DELAY,
        }
    }
}

/// Summary of one news sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsSyncResult {
    pub total_stocks: usize,
    /// Relevant articles written (new + updated).
    pub total_articles: usize,
    pub new_articles: usize,
    pub updated_articles: usize,
    /// Articles dropped by the relevance classifier.
    pub skipped_articles: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub success: bool,
}

/// Per-instrument article counts.
#[derive(Debug, Default, Clone, Copy)]
struct InstrumentNewsCounts {
    new: usize,
    updated: usize,
    skipped: usize,
    /// Relevant articles the store rejected.
    failed: usize,
}

pub struct NewsSyncService {
    provider: Arc<dyn NewsProvider>,
    news: Arc<dyn NewsRepositoryTrait>,
    watchlists: Arc<dyn WatchlistRepositoryTrait>,
    throttle: Throttle,
}

impl NewsSyncService {
    pub fn new(
        provider: Arc<dyn NewsProvider>,
        news: Arc<dyn NewsRepositoryTrait>,
        watchlists: Arc<dyn WatchlistRepositoryTrait>,
        config: NewsSyncConfig,
    ) -> Self {
        Self {
            provider,
            news,
            watchlists,
            throttle: Throttle::fixed(config.inter_call_delay),
        }
    }

    /// Sync today's (UTC) news for every tracked instrument.
    pub async fn sync_news(&self) -> Result<NewsSyncResult> {
        self.sync_news_for_day(Utc::now().date_naive()).await
    }

    /// Sync one day's news window for every tracked instrument.
    ///
    /// Fails only when the tracked set itself cannot be loaded. An instrument
    /// whose fetch fails, or with any article the store rejects, counts as an
    /// error; articles that were stored are counted either way.
    pub async fn sync_news_for_day(&self, day: NaiveDate) -> Result<NewsSyncResult> {
        let instruments = self.watchlists.find_distinct_tracked_instruments()?;

        info!(
            "News sync: {} tracked instruments for {}",
            instruments.len(),
            day
        );

        let outcomes = self
            .throttle
            .for_each(instruments.iter(), |instrument| {
                self.sync_instrument(instrument, day)
            })
            .await;

        let mut result = NewsSyncResult {
            total_stocks: instruments.len(),
            ..Default::default()
        };

        for (instrument, outcome) in instruments.iter().zip(outcomes) {
            match outcome {
                Ok(counts) => {
                    result.new_articles += counts.new;
                    result.updated_articles += counts.updated;
                    result.skipped_articles += counts.skipped;
                    if counts.failed > 0 {
                        warn!(
                            "News sync for {}: {} articles could not be stored",
                            instrument.symbol, counts.failed
                        );
                        result.error_count += 1;
                    } else {
                        result.success_count += 1;
                    }
                }
                Err(e) => {
                    warn!("News sync failed for {}: {}", instrument.symbol, e);
                    result.error_count += 1;
                }
            }
        }

        result.total_articles = result.new_articles + result.updated_articles;
        result.success = result.error_count == 0;

        info!(
            "News sync finished: stocks={}, articles={} (new={}, updated={}), errors={}",
            result.total_stocks,
            result.total_articles,
            result.new_articles,
            result.updated_articles,
            result.error_count
        );

        Ok(result)
    }

    async fn sync_instrument(
        &self,
        instrument: &Instrument,
        day: NaiveDate,
    ) -> Result<InstrumentNewsCounts> {
        let items = self
            .provider
            .fetch_company_news(&instrument.symbol, day, day)
            .await?;

        let classifier = RelevanceClassifier::new(&instrument.symbol, &instrument.description);
        let mut counts = InstrumentNewsCounts::default();

        for item in &items {
            let summary = Some(item.summary.as_str()).filter(|s| !s.is_empty());
            if !classifier.is_relevant(&item.headline, summary) {
                counts.skipped += 1;
                continue;
            }

            let article = NewNewsArticle::from_item(item, &instrument.id);
            match self.upsert_article(article).await {
                Ok(true) => counts.new += 1,
                Ok(false) => counts.updated += 1,
                Err(e) => {
                    warn!(
                        "News sync: failed to store article {} for {}: {}",
                        item.id, instrument.symbol, e
                    );
                    counts.failed += 1;
                }
            }
        }

        debug!(
            "News sync: {} -> {} items, {} new, {} updated, {} irrelevant, {} failed",
            instrument.symbol,
            items.len(),
            counts.new,
            counts.updated,
            counts.skipped,
            counts.failed
        );

        Ok(counts)
    }

    /// Returns true when the article was not stored before.
    async fn upsert_article(&self, article: NewNewsArticle) -> Result<bool> {
        let existed = self.news.find_by_upstream_id(article.upstream_id)?.is_some();
        self.news.upsert_by_upstream_id(article).await?;
        Ok(!existed)
    }
}
