use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use marketsync_core::instruments::Instrument;
use marketsync_core::watchlists::{WatchlistItem, WatchlistRepositoryTrait};
use marketsync_core::Result;

use super::model::WatchlistItemDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::instruments::InstrumentDB;
use crate::schema::{instruments, watchlist_items};

/// Repository for watch relationships
pub struct WatchlistRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl WatchlistRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl WatchlistRepositoryTrait for WatchlistRepository {
    fn find_distinct_tracked_instruments(&self) -> Result<Vec<Instrument>> {
        let mut conn = get_connection(&self.pool)?;

        let results = instruments::table
            .inner_join(watchlist_items::table)
            .select(InstrumentDB::as_select())
            .distinct()
            .order(instruments::symbol.asc())
            .load::<InstrumentDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(results.into_iter().map(Instrument::from).collect())
    }

    async fn add_item(&self, owner_id: String, instrument_id: String) -> Result<WatchlistItem> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<WatchlistItem> {
                let row = WatchlistItemDB {
                    id: uuid::Uuid::new_v4().to_string(),
                    owner_id,
                    instrument_id,
                    created_at: Utc::now().naive_utc(),
                };

                diesel::insert_into(watchlist_items::table)
                    .values(&row)
                    .on_conflict((watchlist_items::owner_id, watchlist_items::instrument_id))
                    .do_nothing()
                    .execute(conn)
                    .map_err(StorageError::from)?;

                watchlist_items::table
                    .filter(watchlist_items::owner_id.eq(&row.owner_id))
                    .filter(watchlist_items::instrument_id.eq(&row.instrument_id))
                    .select(WatchlistItemDB::as_select())
                    .first::<WatchlistItemDB>(conn)
                    .map(WatchlistItem::from)
                    .map_err(|e| StorageError::from(e).into())
            })
            .await
    }

    async fn remove_item(&self, owner_id: String, instrument_id: String) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(
                    watchlist_items::table
                        .filter(watchlist_items::owner_id.eq(&owner_id))
                        .filter(watchlist_items::instrument_id.eq(&instrument_id)),
                )
                .execute(conn)
                .map_err(|e| StorageError::from(e).into())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use crate::instruments::InstrumentRepository;
    use marketsync_core::instruments::{InstrumentRepositoryTrait, InstrumentUpsert};

    async fn seed(repo: &InstrumentRepository, symbol: &str) -> String {
        repo.upsert_by_symbol(InstrumentUpsert {
            symbol: symbol.to_string(),
            display_symbol: symbol.to_string(),
            description: String::new(),
            instrument_type: "Common Stock".to_string(),
            exchange: "US".to_string(),
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_tracked_set_is_distinct() {
        let (pool, writer, _temp_dir) = test_database();
        let instruments = InstrumentRepository::new(pool.clone(), writer.clone());
        let repo = WatchlistRepository::new(pool, writer);
        let apple = seed(&instruments, "AAPL").await;
        let microsoft = seed(&instruments, "MSFT").await;
        seed(&instruments, "IBM").await;

        repo.add_item("alice".into(), apple.clone()).await.unwrap();
        repo.add_item("bob".into(), apple).await.unwrap();
        repo.add_item("bob".into(), microsoft).await.unwrap();

        let tracked = repo.find_distinct_tracked_instruments().unwrap();
        let symbols: Vec<_> = tracked.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_add_item_is_idempotent() {
        let (pool, writer, _temp_dir) = test_database();
        let instruments = InstrumentRepository::new(pool.clone(), writer.clone());
        let repo = WatchlistRepository::new(pool, writer);
        let apple = seed(&instruments, "AAPL").await;

        let first = repo.add_item("alice".into(), apple.clone()).await.unwrap();
        let second = repo.add_item("alice".into(), apple).await.unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_remove_item_untracks() {
        let (pool, writer, _temp_dir) = test_database();
        let instruments = InstrumentRepository::new(pool.clone(), writer.clone());
        let repo = WatchlistRepository::new(pool, writer);
        let apple = seed(&instruments, "AAPL").await;

        repo.add_item("alice".into(), apple.clone()).await.unwrap();
        assert_eq!(repo.remove_item("alice".into(), apple.clone()).await.unwrap(), 1);
        assert_eq!(repo.remove_item("alice".into(), apple).await.unwrap(), 0);
        assert!(repo.find_distinct_tracked_instruments().unwrap().is_empty());
    }
}
