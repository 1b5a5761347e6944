//! Instruments module - catalog models, store traits, catalog sync and search.

mod catalog_sync;
mod instruments_model;
mod instruments_traits;
mod search_service;


pub use catalog_sync::{CatalogSyncConfig, CatalogSyncError, CatalogSyncResult, CatalogSyncService};
pub use instruments_model::{normalize_symbol, Instrument, InstrumentUpsert};
pub use instruments_traits::InstrumentRepositoryTrait;
pub use search_service::{InstrumentSearchConfig, InstrumentSearchService};
