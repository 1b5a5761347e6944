//! Upstream provider trait definitions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::{NewsItem, SymbolListing};

/// Source of instrument reference data.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Unique identifier for this provider, used in logs and errors.
    fn id(&self) -> &'static str;

    /// Fetch the full instrument listing for an exchange filter (e.g. "US").
    ///
    /// The listing is a single all-or-nothing page.
    async fn fetch_symbols(&self, exchange: &str) -> Result<Vec<SymbolListing>, MarketDataError>;

    /// Look up instruments matching a free-text query.
    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolListing>, MarketDataError>;
}

/// Source of per-instrument news.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Unique identifier for this provider, used in logs and errors.
    fn id(&self) -> &'static str;

    /// Fetch articles about `symbol` published between `from` and `to` (inclusive dates).
    async fn fetch_company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>, MarketDataError>;
}
