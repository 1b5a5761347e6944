use crate::errors::Result;
use crate::instruments::instruments_model::{Instrument, InstrumentUpsert};
use async_trait::async_trait;

/// Trait for instrument repository operations.
///
/// Writes are atomic per record; `upsert_by_symbol` is idempotent on the
/// canonical symbol.
#[async_trait]
pub trait InstrumentRepositoryTrait: Send + Sync {
    fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>>;
    async fn upsert_by_symbol(&self, instrument: InstrumentUpsert) -> Result<Instrument>;
    fn find_many_missing_image(&self, limit: i64) -> Result<Vec<Instrument>>;
    async fn set_image_ref(&self, symbol: String, image_ref: String) -> Result<()>;
    /// Symbol prefix or description substring match, case-insensitive.
    fn search(&self, query: &str, limit: i64) -> Result<Vec<Instrument>>;
}
