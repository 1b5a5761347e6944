use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One owner watching one instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub id: String,
    pub owner_id: String,
    pub instrument_id: String,
    pub created_at: NaiveDateTime,
}
