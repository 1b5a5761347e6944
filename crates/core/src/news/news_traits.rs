use crate::errors::Result;
use crate::news::news_model::{NewNewsArticle, NewsArticle};
use async_trait::async_trait;

/// Trait for news repository operations.
///
/// `upstream_id` and `url` are each unique; upserting an article seen before
/// updates it in place.
#[async_trait]
pub trait NewsRepositoryTrait: Send + Sync {
    fn find_by_upstream_id(&self, upstream_id: i64) -> Result<Option<NewsArticle>>;
    async fn upsert_by_upstream_id(&self, article: NewNewsArticle) -> Result<NewsArticle>;
    /// Newest first.
    fn list_for_instrument(&self, symbol: &str, limit: i64) -> Result<Vec<NewsArticle>>;
}
