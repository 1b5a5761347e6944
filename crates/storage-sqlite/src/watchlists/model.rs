//! Database model for watchlist items.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use marketsync_core::watchlists::WatchlistItem;

#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::watchlist_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WatchlistItemDB {
    pub id: String,
    pub owner_id: String,
    pub instrument_id: String,
    pub created_at: NaiveDateTime,
}

impl From<WatchlistItemDB> for WatchlistItem {
    fn from(db: WatchlistItemDB) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            instrument_id: db.instrument_id,
            created_at: db.created_at,
        }
    }
}
