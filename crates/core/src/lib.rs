//! Rangeops Core - change capture, commit-gated domain events and realtime
//! fan-out for exercise scenarios.
//!
//! This crate is database-agnostic. Persistence engines implement the
//! [`unit_of_work::Store`] and [`unit_of_work::StoreSession`] traits; the
//! `storage-sqlite` crate provides the production engine.

pub mod broadcast;
pub mod changes;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod scenarios;
pub mod scoring;
pub mod tasks;
pub mod unit_of_work;

pub use entities::{Entity, EntityKey, EntityKind, OwnershipScope};
pub use pipeline::Pipeline;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
