//! SQLite row models for tasks and results.

mod model;

pub use model::{ResultDB, TaskDB};
