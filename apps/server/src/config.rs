//! Environment-driven process configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use marketsync_core::constants::{
    BROWSER_TIMEOUT, DEFAULT_EXCHANGE, DEFAULT_INSTRUMENT_TYPE, LOGO_BACKFILL_LIMIT,
    NEWS_INTER_CALL_DELAY,
};

const DEFAULT_DB_PATH: &str = "./db/marketsync.db";
const DEFAULT_LOGO_DIR: &str = "./public/logos";
const DEFAULT_LOGO_PUBLIC_PREFIX: &str = "/logos";
const DEFAULT_NEWS_INTERVAL_SECS: u64 = 15 * 60;
const DEFAULT_CATALOG_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// Only upstream-facing commands need it.
    pub finnhub_api_key: Option<String>,
    pub catalog_exchange: String,
    pub catalog_instrument_type: String,
    pub news_delay: Duration,
    pub news_interval: Duration,
    pub catalog_interval: Duration,
    pub logo_dir: PathBuf,
    pub logo_public_prefix: String,
    pub logo_backfill_limit: i64,
    pub browser_timeout: Duration,
    pub chrome_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            db_path: env_string("MS_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            finnhub_api_key: env_string("FINNHUB_API_KEY"),
            catalog_exchange: env_string("MS_CATALOG_EXCHANGE")
                .unwrap_or_else(|| DEFAULT_EXCHANGE.to_string()),
            catalog_instrument_type: env_string("MS_CATALOG_INSTRUMENT_TYPE")
                .unwrap_or_else(|| DEFAULT_INSTRUMENT_TYPE.to_string()),
            news_delay: Duration::from_millis(env_parse(
                "MS_NEWS_DELAY_MS",
                NEWS_INTER_CALL_DELAY.as_millis() as u64,
            )),
            news_interval: Duration::from_secs(env_parse(
                "MS_NEWS_INTERVAL_SECS",
                DEFAULT_NEWS_INTERVAL_SECS,
            )),
            catalog_interval: Duration::from_secs(env_parse(
                "MS_CATALOG_INTERVAL_SECS",
                DEFAULT_CATALOG_INTERVAL_SECS,
            )),
            logo_dir: env_string("MS_LOGO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGO_DIR)),
            logo_public_prefix: env_string("MS_LOGO_PUBLIC_PREFIX")
                .unwrap_or_else(|| DEFAULT_LOGO_PUBLIC_PREFIX.to_string()),
            logo_backfill_limit: env_parse("MS_LOGO_BACKFILL_LIMIT", LOGO_BACKFILL_LIMIT),
            browser_timeout: Duration::from_secs(env_parse(
                "MS_BROWSER_TIMEOUT_SECS",
                BROWSER_TIMEOUT.as_secs(),
            )),
            chrome_path: env_string("MS_CHROME_PATH").map(PathBuf::from),
        }
    }
}

/// Non-blank value of an environment variable.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parsed value of an environment variable, or `default` when unset or invalid.
fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
