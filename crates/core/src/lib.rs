//! Marketsync Core - domain models, store traits and the synchronization engine.
//!
//! This crate keeps the local instrument and news store current against a
//! rate-limited upstream and scrapes instrument logos through a shared
//! headless browser. It is database-agnostic and browser-agnostic: the
//! `storage-sqlite` crate implements the repository traits and the `browser`
//! crate implements the browser traits.

pub mod constants;
pub mod errors;
pub mod instruments;
pub mod logos;
pub mod news;
pub mod sync;
pub mod watchlists;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
