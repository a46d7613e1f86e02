//! Per-transaction record of applied mutations.
//!
//! The ledger lives inside one unit of work and survives every flush of that
//! unit of work. It is drained exactly once, at commit, or discarded on
//! rollback.

use super::pending::{ChangeOperation, PendingChange};
use crate::entities::{Entity, EntityKey, EntityKind};

/// One applied mutation awaiting publication.
///
/// Entries are immutable once recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEntry {
    entity: Entity,
    operation: ChangeOperation,
    changed_fields: Vec<String>,
}

impl LedgerEntry {
    pub fn new(entity: Entity, operation: ChangeOperation, changed_fields: Vec<String>) -> Self {
        Self {
            entity,
            operation,
            changed_fields,
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn operation(&self) -> ChangeOperation {
        self.operation
    }

    pub fn changed_fields(&self) -> &[String] {
        &self.changed_fields
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    pub fn key(&self) -> EntityKey {
        self.entity.key()
    }

    pub fn into_parts(self) -> (Entity, ChangeOperation, Vec<String>) {
        (self.entity, self.operation, self.changed_fields)
    }
}

impl From<PendingChange> for LedgerEntry {
    fn from(change: PendingChange) -> Self {
        Self::new(change.entity, change.operation, change.changed_fields)
    }
}

/// Ordered, append-only list of ledger entries.
///
/// Duplicates are allowed: an entity created and then updated within one
/// transaction appears twice.
#[derive(Debug, Default)]
pub struct ChangeLedger {
    entries: Vec<LedgerEntry>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn record_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = LedgerEntry>,
    {
        self.entries.extend(entries);
    }

    /// Returns every entry in insertion order and leaves the ledger empty.
    pub fn drain_all(&mut self) -> Vec<LedgerEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Drops every entry without handing them out. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
