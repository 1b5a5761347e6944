//! Instrument listing model.

use serde::{Deserialize, Serialize};

/// One instrument as reported by the upstream catalog or symbol search.
///
/// Bulk listings carry the exchange fields; search results only carry the
/// first four, so everything after `instrument_type` is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolListing {
    /// Ticker used for API calls (e.g., "AAPL", "BRK.B")
    pub symbol: String,

    /// Ticker as displayed to users
    #[serde(default)]
    pub display_symbol: String,

    /// Free-text name (e.g., "APPLE INC")
    #[serde(default)]
    pub description: String,

    /// Security type tag (e.g., "Common Stock", "ETP", "ADR")
    #[serde(rename = "type", default)]
    pub instrument_type: String,

    /// Market Identifier Code of the primary listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mic: Option<String>,

    /// Trading currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// FIGI identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figi: Option<String>,
}

impl SymbolListing {
    /// Create a listing with the fields every upstream shape provides.
    pub fn new(
        symbol: impl Into<String>,
        description: impl Into<String>,
        instrument_type: impl Into<String>,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            display_symbol: symbol.clone(),
            symbol,
            description: description.into(),
            instrument_type: instrument_type.into(),
            mic: None,
            currency: None,
            figi: None,
        }
    }

    /// Set the MIC.
    pub fn with_mic(mut self, mic: impl Into<String>) -> Self {
        self.mic = Some(mic.into());
        self
    }
}
