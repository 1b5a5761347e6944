//! Instrument domain models.

use chrono::NaiveDateTime;
use marketsync_market_data::SymbolListing;
use serde::{Deserialize, Serialize};

/// Canonical form of a ticker: trimmed and uppercased.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Domain model representing a tradable instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
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

/// Mutable fields written by an upsert keyed on the symbol.
///
/// `image_ref` is deliberately absent: a catalog refresh never clears a logo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentUpsert {
    pub symbol: String,
    pub display_symbol: String,
    pub description: String,
    pub instrument_type: String,
    pub exchange: String,
}

impl InstrumentUpsert {
    /// Build an upsert from an upstream listing. The symbol is canonicalized;
    /// a blank display symbol falls back to it.
    pub fn from_listing(listing: &SymbolListing, exchange: &str) -> Self {
        let symbol = normalize_symbol(&listing.symbol);
        let display_symbol = match listing.display_symbol.trim() {
            "" => symbol.clone(),
            display => display.to_string(),
        };

        Self {
            symbol,
            display_symbol,
            description: listing.description.trim().to_string(),
            instrument_type: listing.instrument_type.clone(),
            exchange: listing
                .mic
                .clone()
                .filter(|mic| !mic.is_empty())
                .unwrap_or_else(|| exchange.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  aapl "), "AAPL");
        assert_eq!(normalize_symbol("brk.b"), "BRK.B");
        assert_eq!(normalize_symbol("   "), "");
    }

    #[test]
    fn test_upsert_from_listing() {
        let mut listing =
            SymbolListing::new(" aapl", "APPLE INC ", "Common Stock").with_mic("XNAS");
        listing.display_symbol = String::new();
        let upsert = InstrumentUpsert::from_listing(&listing, "US");

        assert_eq!(upsert.symbol, "AAPL");
        assert_eq!(upsert.display_symbol, "AAPL");
        assert_eq!(upsert.description, "APPLE INC");
        assert_eq!(upsert.exchange, "XNAS");
    }

    #[test]
    fn test_upsert_falls_back_to_exchange_filter() {
        let listing = SymbolListing::new("SPY", "SPDR S&P 500", "ETP");
        let upsert = InstrumentUpsert::from_listing(&listing, "US");
        assert_eq!(upsert.exchange, "US");
    }
}
