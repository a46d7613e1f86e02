//! Changes staged in a unit of work but not yet flushed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{Entity, EntityKey, EntityKind};

/// The kind of mutation applied to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeOperation {
    Created,
    Updated,
    Deleted,
}

impl ChangeOperation {
    pub const ALL: [ChangeOperation; 3] = [
        ChangeOperation::Created,
        ChangeOperation::Updated,
        ChangeOperation::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOperation::Created => "Created",
            ChangeOperation::Updated => "Updated",
            ChangeOperation::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One staged mutation.
///
/// For `Updated`, `original` holds the snapshot the change was computed
/// against. For `Deleted`, `entity` is the last known state of the row.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingChange {
    pub entity: Entity,
    pub original: Option<Entity>,
    pub operation: ChangeOperation,
    pub changed_fields: Vec<String>,
}

impl PendingChange {
    pub fn created(entity: Entity) -> Self {
        Self {
            entity,
            original: None,
            operation: ChangeOperation::Created,
            changed_fields: Vec::new(),
        }
    }

    /// Stages an update. Returns `None` when the snapshots do not describe
    /// the same row or nothing changed.
    pub fn updated(original: Entity, current: Entity) -> Option<Self> {
        if original.key() != current.key() {
            return None;
        }
        let changed_fields = current.changed_fields(&original)?;
        if changed_fields.is_empty() {
            return None;
        }
        Some(Self {
            entity: current,
            original: Some(original),
            operation: ChangeOperation::Updated,
            changed_fields,
        })
    }

    pub fn deleted(entity: Entity) -> Self {
        Self {
            entity,
            original: None,
            operation: ChangeOperation::Deleted,
            changed_fields: Vec::new(),
        }
    }

    pub fn key(&self) -> EntityKey {
        self.entity.key()
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    pub fn touches_any(&self, fields: &[&str]) -> bool {
        self.changed_fields
            .iter()
            .any(|changed| fields.contains(&changed.as_str()))
    }

    /// Adds `field` to the changed set of an update.
    pub fn mark_field_changed(&mut self, field: &str) {
        if self.operation == ChangeOperation::Updated
            && !self.changed_fields.iter().any(|f| f == field)
        {
            self.changed_fields.push(field.to_string());
        }
    }
}
