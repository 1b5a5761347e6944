use std::sync::Arc;

use log::debug;

use super::watchlists_model::WatchlistItem;
use super::watchlists_traits::WatchlistRepositoryTrait;
use crate::errors::{Error, Result, ValidationError};
use crate::instruments::{normalize_symbol, Instrument, InstrumentRepositoryTrait};

/// Service for managing who watches what
pub struct WatchlistService {
    watchlists: Arc<dyn WatchlistRepositoryTrait>,
    instruments: Arc<dyn InstrumentRepositoryTrait>,
}

impl WatchlistService {
    pub fn new(
        watchlists: Arc<dyn WatchlistRepositoryTrait>,
        instruments: Arc<dyn InstrumentRepositoryTrait>,
    ) -> Self {
        Self {
            watchlists,
            instruments,
        }
    }

    pub async fn watch(&self, owner_id: &str, symbol: &str) -> Result<WatchlistItem> {
        let (owner_id, instrument) = self.resolve(owner_id, symbol)?;
        debug!("{} watches {}", owner_id, instrument.symbol);
        self.watchlists.add_item(owner_id, instrument.id).await
    }

    /// Returns the number of removed relationships (0 when not watched).
    pub async fn unwatch(&self, owner_id: &str, symbol: &str) -> Result<usize> {
        let (owner_id, instrument) = self.resolve(owner_id, symbol)?;
        self.watchlists.remove_item(owner_id, instrument.id).await
    }

    pub fn tracked_instruments(&self) -> Result<Vec<Instrument>> {
        self.watchlists.find_distinct_tracked_instruments()
    }

    fn resolve(&self, owner_id: &str, symbol: &str) -> Result<(String, Instrument)> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(ValidationError::MissingField("owner_id".to_string()).into());
        }

        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }

        let instrument = self
            .instruments
            .find_by_symbol(&symbol)?
            .ok_or_else(|| Error::NotFound(format!("instrument {}", symbol)))?;

        Ok((owner_id.to_string(), instrument))
    }
}
