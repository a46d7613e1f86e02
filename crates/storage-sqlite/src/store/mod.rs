//! SQLite implementation of the unit-of-work persistence seam.

mod rows;
mod sqlite_store;


pub use sqlite_store::{SqliteSession, SqliteStore};
