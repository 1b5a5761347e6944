use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use marketsync_core::instruments::normalize_symbol;
use marketsync_core::news::{NewNewsArticle, NewsArticle, NewsRepositoryTrait};
use marketsync_core::Result;

use super::model::NewsArticleDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{instruments, news_articles};

/// Repository for managing news articles in the database
pub struct NewsRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl NewsRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl NewsRepositoryTrait for NewsRepository {
    fn find_by_upstream_id(&self, upstream_id: i64) -> Result<Option<NewsArticle>> {
        let mut conn = get_connection(&self.pool)?;

        let result = news_articles::table
            .filter(news_articles::upstream_id.eq(upstream_id))
            .select(NewsArticleDB::as_select())
            .first::<NewsArticleDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(result.map(NewsArticle::from))
    }

    async fn upsert_by_upstream_id(&self, article: NewNewsArticle) -> Result<NewsArticle> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<NewsArticle> {
                let row = NewsArticleDB::from_new(article, Utc::now().naive_utc());

                diesel::insert_into(news_articles::table)
                    .values(&row)
                    .on_conflict(news_articles::upstream_id)
                    .do_update()
                    .set(row.changeset())
                    .execute(conn)
                    .map_err(StorageError::from)?;

                news_articles::table
                    .filter(news_articles::upstream_id.eq(row.upstream_id))
                    .select(NewsArticleDB::as_select())
                    .first::<NewsArticleDB>(conn)
                    .map(NewsArticle::from)
                    .map_err(|e| StorageError::from(e).into())
            })
            .await
    }

    fn list_for_instrument(&self, symbol: &str, limit: i64) -> Result<Vec<NewsArticle>> {
        let mut conn = get_connection(&self.pool)?;

        let results = news_articles::table
            .inner_join(instruments::table)
            .filter(instruments::symbol.eq(normalize_symbol(symbol)))
            .order(news_articles::published_at.desc())
            .limit(limit)
            .select(NewsArticleDB::as_select())
            .load::<NewsArticleDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(results.into_iter().map(NewsArticle::from).collect())
    }
}
