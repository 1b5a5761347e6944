//! Marketsync Market Data Crate
//!
//! Upstream reference-data access for the synchronization engine.
//!
//! # Overview
//!
//! The crate exposes two upstream shapes:
//! - A bulk instrument listing plus symbol search ([`CatalogProvider`])
//! - A per-symbol company news window ([`NewsProvider`])
//!
//! Both are implemented by [`FinnhubProvider`], which guards every call with a
//! local token-bucket [`RateLimiter`].
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   Sync engine    | --> | CatalogProvider  |
//! |  (core crate)    |     | NewsProvider     |
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | FinnhubProvider  | --> RateLimiter
//!                          +------------------+
//!                                  |
//!                                  v
//!                     SymbolListing / NewsItem
//! ```

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::MarketDataError;
pub use models::{NewsItem, SymbolListing};
pub use provider::finnhub::FinnhubProvider;
pub use provider::{CatalogProvider, NewsProvider};
pub use registry::{RateLimitConfig, RateLimiter};
