//! SQLite storage implementation for Marketsync.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `marketsync-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for instruments, news and watchlists
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The sync engine in `core` is database-agnostic and works with traits.
//!
//! ```text
//! core (sync engine)
//!       │
//!       ▼
//! storage-sqlite (this crate)
//!       │
//!       ▼
//!   SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod instruments;
pub mod news;
pub mod watchlists;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export repositories
pub use instruments::InstrumentRepository;
pub use news::NewsRepository;
pub use watchlists::WatchlistRepository;

// Re-export from marketsync-core for convenience
pub use marketsync_core::errors::{DatabaseError, Error, Result};
