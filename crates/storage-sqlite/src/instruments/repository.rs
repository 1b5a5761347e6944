use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use marketsync_core::instruments::{
    normalize_symbol, Instrument, InstrumentRepositoryTrait, InstrumentUpsert,
};
use marketsync_core::{Error, Result};

use super::model::InstrumentDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::instruments;

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Repository for managing instrument data in the database
pub struct InstrumentRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl InstrumentRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }

    /// Total number of stored instruments
    pub fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;

        instruments::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| StorageError::from(e).into())
    }
}

#[async_trait]
impl InstrumentRepositoryTrait for InstrumentRepository {
    fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>> {
        let mut conn = get_connection(&self.pool)?;

        let result = instruments::table
            .filter(instruments::symbol.eq(normalize_symbol(symbol)))
            .select(InstrumentDB::as_select())
            .first::<InstrumentDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(result.map(Instrument::from))
    }

    /// Inserts the instrument or refreshes its descriptive fields when the
    /// symbol already exists. `id`, `image_ref` and `created_at` survive.
    async fn upsert_by_symbol(&self, upsert: InstrumentUpsert) -> Result<Instrument> {
        let mut upsert = upsert;
        upsert.symbol = normalize_symbol(&upsert.symbol);
        if upsert.symbol.is_empty() {
            return Err(Error::Validation(
                marketsync_core::errors::ValidationError::MissingField("symbol".to_string()),
            ));
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Instrument> {
                let row = InstrumentDB::from_upsert(upsert, Utc::now().naive_utc());

                diesel::insert_into(instruments::table)
                    .values(&row)
                    .on_conflict(instruments::symbol)
                    .do_update()
                    .set((
                        instruments::display_symbol.eq(&row.display_symbol),
                        instruments::description.eq(&row.description),
                        instruments::instrument_type.eq(&row.instrument_type),
                        instruments::exchange.eq(&row.exchange),
                        instruments::updated_at.eq(row.updated_at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                instruments::table
                    .filter(instruments::symbol.eq(&row.symbol))
                    .select(InstrumentDB::as_select())
                    .first::<InstrumentDB>(conn)
                    .map(Instrument::from)
                    .map_err(|e| StorageError::from(e).into())
            })
            .await
    }

    fn find_many_missing_image(&self, limit: i64) -> Result<Vec<Instrument>> {
        let mut conn = get_connection(&self.pool)?;

        let results = instruments::table
            .filter(instruments::image_ref.is_null())
            .order(instruments::symbol.asc())
            .limit(limit)
            .select(InstrumentDB::as_select())
            .load::<InstrumentDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(results.into_iter().map(Instrument::from).collect())
    }

    async fn set_image_ref(&self, symbol: String, image_ref: String) -> Result<()> {
        let symbol = normalize_symbol(&symbol);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let updated = diesel::update(
                    instruments::table.filter(instruments::symbol.eq(&symbol)),
                )
                .set((
                    instruments::image_ref.eq(Some(image_ref)),
                    instruments::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                if updated == 0 {
                    return Err(Error::NotFound(format!("Instrument {}", symbol)));
                }
                Ok(())
            })
            .await
    }

    fn search(&self, query: &str, limit: i64) -> Result<Vec<Instrument>> {
        let mut conn = get_connection(&self.pool)?;

        // SQLite LIKE is case-insensitive for ASCII
        let escaped = escape_like(query.trim());
        let prefix = format!("{}%", escaped);
        let contains = format!("%{}%", escaped);

        let results = instruments::table
            .filter(
                instruments::symbol
                    .like(prefix)
                    .escape('\\')
                    .or(instruments::description.like(contains).escape('\\')),
            )
            .order(instruments::symbol.asc())
            .limit(limit)
            .select(InstrumentDB::as_select())
            .load::<InstrumentDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(results.into_iter().map(Instrument::from).collect())
    }
}
