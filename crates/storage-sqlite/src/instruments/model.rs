//! Database model for instruments.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use marketsync_core::instruments::{Instrument, InstrumentUpsert};

/// Database model for instruments
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
    Default,
)]
#[diesel(table_name = crate::schema::instruments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InstrumentDB {
    pub id: String,
    pub symbol: String,
    pub display_symbol: String,
    pub description: String,
    pub instrument_type: String,
    pub exchange: String,
    pub image_ref: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl InstrumentDB {
    /// New row for an upsert; the id is only kept when the symbol is new.
    pub fn from_upsert(upsert: InstrumentUpsert, now: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: upsert.symbol,
            display_symbol: upsert.display_symbol,
            description: upsert.description,
            instrument_type: upsert.instrument_type,
            exchange: upsert.exchange,
            image_ref: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<InstrumentDB> for Instrument {
    fn from(db: InstrumentDB) -> Self {
        Self {
            id: db.id,
            symbol: db.symbol,
            display_symbol: db.display_symbol,
            description: db.description,
            instrument_type: db.instrument_type,
            exchange: db.exchange,
            image_ref: db.image_ref,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
