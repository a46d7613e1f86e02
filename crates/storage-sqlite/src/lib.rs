//! SQLite storage implementation for rangeops.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the unit-of-work persistence seam defined in
//! `rangeops-core` and contains:
//! - Database connection pooling, PRAGMAs and embedded migrations
//! - Database-specific row models (with Diesel derives) and their domain
//!   conversions
//! - [`SqliteStore`], the transactional engine behind every unit of work
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies
//! exist. `core` is database-agnostic and works with traits.
//!
//! ```text
//!   core (domain, unit of work)      server
//!              │                       │
//!              └──────────┬────────────┘
//!                         ▼
//!             storage-sqlite (this crate)
//!                         │
//!                         ▼
//!                     SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod scenarios;
pub mod schema;
pub mod store;
pub mod tasks;
mod utils;

// Re-export database utilities
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use store::{SqliteSession, SqliteStore};

// Re-export from rangeops-core for convenience
pub use rangeops_core::errors::{DatabaseError, Error, Result};
