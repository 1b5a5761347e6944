//! News domain models.

use chrono::NaiveDateTime;
use marketsync_market_data::NewsItem;
use serde::{Deserialize, Serialize};

/// Domain model representing a stored news article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub upstream_id: i64,
    pub instrument_id: String,
    pub headline: String,
    pub summary: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub published_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for an upsert keyed on `upstream_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewNewsArticle {
    pub upstream_id: i64,
    pub instrument_id: String,
    pub headline: String,
    pub summary: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub published_at: NaiveDateTime,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl NewNewsArticle {
    /// Map an upstream item onto the owning instrument.
    ///
    /// Blank optional fields become `None`. An out-of-range epoch falls back
    /// to the Unix epoch rather than dropping the article.
    pub fn from_item(item: &NewsItem, instrument_id: &str) -> Self {
        let published_at = item
            .published_at()
            .map(|dt| dt.naive_utc())
            .unwrap_or_default();

        Self {
            upstream_id: item.id,
            instrument_id: instrument_id.to_string(),
            headline: item.headline.trim().to_string(),
            summary: non_empty(&item.summary),
            url: item.url.trim().to_string(),
            source: non_empty(&item.source),
            category: non_empty(&item.category),
            image_url: non_empty(&item.image),
            published_at,
        }
    }
}
