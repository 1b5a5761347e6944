//! Upstream provider abstractions and implementations.
//!
//! This module contains:
//! - The `CatalogProvider` and `NewsProvider` traits the engine depends on
//! - The Finnhub implementation of both
//!
//! The engine only ever sees the traits, so tests can swap in fakes and a
//! second upstream can be added without touching the synchronizers.

mod traits;

pub mod finnhub;

pub use traits::{CatalogProvider, NewsProvider};
