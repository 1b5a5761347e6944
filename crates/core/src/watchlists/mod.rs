//! Watchlists module - watch relationships that define the tracked instrument set.

mod watchlists_model;
mod watchlists_service;
mod watchlists_traits;

pub use watchlists_model::WatchlistItem;
pub use watchlists_service::WatchlistService;
pub use watchlists_traits::WatchlistRepositoryTrait;
