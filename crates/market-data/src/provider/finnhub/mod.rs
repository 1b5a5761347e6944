//! Finnhub upstream provider implementation.
//!
//! This module provides reference data from the Finnhub API:
//! - Bulk instrument listings via the /stock/symbol endpoint
//! - Symbol search via the /search endpoint
//! - Company news via the /company-news endpoint
//!
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{NewsItem, SymbolListing};
use crate::provider::{CatalogProvider, NewsProvider};
use crate::registry::{RateLimitConfig, RateLimiter};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /search endpoint
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SymbolListing>,
    // Note: count field exists but we use result.len() instead
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub reference data provider.
///
/// Every request first takes a token from the provider's own rate limiter,
/// sized to the free-tier quota.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a provider that talks to a different base URL (proxies, tests).
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: RateLimiter::with_config(RateLimitConfig::default()),
        }
    }

    /// Replace the local rate limit (e.g. for a paid plan).
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.limiter = RateLimiter::with_config(config);
        self
    }

    /// Make a GET request to the Finnhub API and return the raw body.
    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        self.limiter.acquire().await;

        let url = format!("{}{}", self.base_url, endpoint);

        // API key as header keeps it out of logged URLs
        let request = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params);

        debug!(
            "Finnhub request: {} with {} params",
            endpoint,
            params.len()
        );

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Invalid or missing API key".to_string(),
            });
        }

        // Finnhub answers 403 once the plan quota is exhausted
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                if let Some(error_msg) = error_resp.error {
                    return Err(MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message: error_msg,
                    });
                }
            }

            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} - {}", status, body),
            });
        }

        response.text().await.map_err(MarketDataError::Network)
    }

    /// GET an endpoint and decode its JSON body.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let text = self.fetch(endpoint, params).await?;
        parse_body(endpoint, &text)
    }
}

/// Decode a response body, surfacing Finnhub's `{"error": ...}` payloads as provider errors.
fn parse_body<T: DeserializeOwned>(endpoint: &str, text: &str) -> Result<T, MarketDataError> {
    serde_json::from_str(text).map_err(|e| {
        if let Ok(ErrorResponse { error: Some(message) }) = serde_json::from_str(text) {
            return MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message,
            };
        }
        MarketDataError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse {} response: {}", endpoint, e),
        }
    })
}

#[async_trait]
impl CatalogProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_symbols(&self, exchange: &str) -> Result<Vec<SymbolListing>, MarketDataError> {
        let listings: Vec<SymbolListing> = self
            .fetch_json("/stock/symbol", &[("exchange", exchange)])
            .await?;

        debug!(
            "Finnhub: fetched {} listings for exchange {}",
            listings.len(),
            exchange
        );

        Ok(listings)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolListing>, MarketDataError> {
        let response: SearchResponse = self.fetch_json("/search", &[("q", query)]).await?;

        debug!(
            "Finnhub: search '{}' returned {} results",
            query,
            response.result.len()
        );

        Ok(response.result)
    }
}

#[async_trait]
impl NewsProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>, MarketDataError> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();

        let items: Vec<NewsItem> = self
            .fetch_json(
                "/company-news",
                &[("symbol", symbol), ("from", &from), ("to", &to)],
            )
            .await?;

        debug!(
            "Finnhub: fetched {} news items for {} ({} to {})",
            items.len(),
            symbol,
            from,
            to
        );

        Ok(items)
    }
}

// ============================================================================
// Tests
// ============================================================================
