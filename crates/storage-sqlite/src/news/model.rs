//! Database models for news articles.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use marketsync_core::news::{NewNewsArticle, NewsArticle};

/// Database model for news articles
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::news_articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NewsArticleDB {
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

/// Columns refreshed when an article is seen again.
///
/// Cleared optional fields are written as NULL.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::news_articles)]
#[diesel(treat_none_as_null = true)]
pub struct NewsArticleChangesetDB {
    pub instrument_id: String,
    pub headline: String,
    pub summary: Option<String>,
    pub url: String,
    pub source: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub published_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewsArticleDB {
    pub fn from_new(article: NewNewsArticle, now: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            upstream_id: article.upstream_id,
            instrument_id: article.instrument_id,
            headline: article.headline,
            summary: article.summary,
            url: article.url,
            source: article.source,
            category: article.category,
            image_url: article.image_url,
            published_at: article.published_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn changeset(&self) -> NewsArticleChangesetDB {
        NewsArticleChangesetDB {
            instrument_id: self.instrument_id.clone(),
            headline: self.headline.clone(),
            summary: self.summary.clone(),
            url: self.url.clone(),
            source: self.source.clone(),
            category: self.category.clone(),
            image_url: self.image_url.clone(),
            published_at: self.published_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<NewsArticleDB> for NewsArticle {
    fn from(db: NewsArticleDB) -> Self {
        Self {
            id: db.id,
            upstream_id: db.upstream_id,
            instrument_id: db.instrument_id,
            headline: db.headline,
            summary: db.summary,
            url: db.url,
            source: db.source,
            category: db.category,
            image_url: db.image_url,
            published_at: db.published_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
