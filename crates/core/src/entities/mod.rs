//! Entity kinds, identities and ownership scopes shared by the pipeline.

mod entities_model;
pub mod fields;

pub use entities_model::{Entity, EntityKey, EntityKind, EntityModel, Owner, OwnershipScope};
pub(crate) use entities_model::{validate_name, FieldDiff};
