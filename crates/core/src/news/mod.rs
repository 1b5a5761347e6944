//! News module - article models, store traits, relevance and rate-limited sync.

mod news_model;
mod news_sync;
mod news_traits;
mod relevance;

#[cfg(test)]
mod news_sync_tests;

pub use news_model::{NewNewsArticle, NewsArticle};
pub use news_sync::{NewsSyncConfig, NewsSyncResult, NewsSyncService};
pub use news_traits::NewsRepositoryTrait;
pub use relevance::{significant_tokens, RelevanceClassifier};
