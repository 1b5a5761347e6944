use crate::errors::Result;
use crate::instruments::Instrument;
use crate::watchlists::watchlists_model::WatchlistItem;
use async_trait::async_trait;

/// Trait for watchlist repository operations
#[async_trait]
pub trait WatchlistRepositoryTrait: Send + Sync {
    /// Distinct instruments referenced by any watch relationship, by symbol.
    fn find_distinct_tracked_instruments(&self) -> Result<Vec<Instrument>>;
    /// Idempotent: watching an already watched instrument returns the existing item.
    async fn add_item(&self, owner_id: String, instrument_id: String) -> Result<WatchlistItem>;
    async fn remove_item(&self, owner_id: String, instrument_id: String) -> Result<usize>;
}
