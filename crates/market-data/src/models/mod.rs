//! Upstream data models.
//!
//! These are the shapes the engine consumes from providers. Providers map
//! their wire formats onto them; nothing here is persisted directly.

mod listing;
mod news;

pub use listing::SymbolListing;
pub use news::NewsItem;
