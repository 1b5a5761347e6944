//! Error types for the market data crate.
//!
//! [`MarketDataError`] covers every failure an upstream call can produce.
//! [`MarketDataError::is_transient`] tells callers whether a retry has a
//! reasonable chance of succeeding.

use thiserror::Error;

/// Errors that can occur while talking to an upstream provider.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider rate limited the request (HTTP 429, or 403 on quota exhaustion).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with an error status or error payload.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered 2xx but the body could not be understood.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that returned the body
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns true when the failure is likely to go away on its own.
    ///
    /// Rate limiting, timeouts and transport failures are transient. Provider
    /// errors and malformed bodies are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use marketsync_market_data::errors::MarketDataError;
    ///
    /// let error = MarketDataError::RateLimited { provider: "FINNHUB".to_string() };
    /// assert!(error.is_transient());
    ///
    /// let error = MarketDataError::InvalidResponse {
    ///     provider: "FINNHUB".to_string(),
    ///     message: "expected array".to_string(),
    /// };
    /// assert!(!error.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network(_) => true,
            Self::ProviderError { .. } | Self::InvalidResponse { .. } => false,
        }
    }
}
