//! Company news model.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A news article as returned by the upstream company-news endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Upstream-assigned article identifier
    pub id: i64,

    /// Publish time as epoch seconds
    #[serde(rename = "datetime")]
    pub published_epoch: i64,

    pub headline: String,

    #[serde(default)]
    pub summary: String,

    pub url: String,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub category: String,

    /// Thumbnail URL
    #[serde(default)]
    pub image: String,

    /// Symbol the upstream associated the article with
    #[serde(default)]
    pub related: String,
}

impl NewsItem {
    /// Publish timestamp derived from the epoch-seconds field.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.published_epoch, 0).single()
    }
}
