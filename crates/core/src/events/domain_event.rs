//! Domain event types.

use serde::Serialize;
use uuid::Uuid;

use crate::changes::{ChangeOperation, LedgerEntry};
use crate::entities::{Entity, EntityKey, EntityKind, OwnershipScope};

/// Facts about committed entity mutations.
///
/// One event is built per ledger entry after the transaction commits.
/// Deletions carry only the identity and the ownership scope the row had.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum DomainEvent {
    Created {
        entity: Entity,
    },
    #[serde(rename_all = "camelCase")]
    Updated {
        entity: Entity,
        changed_fields: Vec<String>,
    },
    Deleted {
        key: EntityKey,
        scope: OwnershipScope,
    },
}

/// Subscription key: which kind of entity, which operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventShape {
    pub kind: EntityKind,
    pub operation: ChangeOperation,
}

impl EventShape {
    pub const fn new(kind: EntityKind, operation: ChangeOperation) -> Self {
        Self { kind, operation }
    }

    /// Stable wire name of events with this shape.
    pub fn name(&self) -> &'static str {
        event_name(self.kind, self.operation)
    }

    /// Every shape, grouped by entity kind.
    pub fn all() -> impl Iterator<Item = EventShape> {
        EntityKind::ALL.into_iter().flat_map(|kind| {
            ChangeOperation::ALL
                .into_iter()
                .map(move |operation| EventShape::new(kind, operation))
        })
    }
}

/// Maps (entity kind, operation) to the event name used on the realtime channel.
pub fn event_name(kind: EntityKind, operation: ChangeOperation) -> &'static str {
    use ChangeOperation::*;
    use EntityKind::*;

    match (kind, operation) {
        (ScenarioTemplate, Created) => "ScenarioTemplateCreated",
        (ScenarioTemplate, Updated) => "ScenarioTemplateUpdated",
        (ScenarioTemplate, Deleted) => "ScenarioTemplateDeleted",
        (Scenario, Created) => "ScenarioCreated",
        (Scenario, Updated) => "ScenarioUpdated",
        (Scenario, Deleted) => "ScenarioDeleted",
        (Task, Created) => "TaskCreated",
        (Task, Updated) => "TaskUpdated",
        (Task, Deleted) => "TaskDeleted",
        (Result, Created) => "ResultCreated",
        (Result, Updated) => "ResultUpdated",
        (Result, Deleted) => "ResultDeleted",
        (ScenarioMembership, Created) => "ScenarioMembershipCreated",
        (ScenarioMembership, Updated) => "ScenarioMembershipUpdated",
        (ScenarioMembership, Deleted) => "ScenarioMembershipDeleted",
        (ScenarioTemplateMembership, Created) => "ScenarioTemplateMembershipCreated",
        (ScenarioTemplateMembership, Updated) => "ScenarioTemplateMembershipUpdated",
        (ScenarioTemplateMembership, Deleted) => "ScenarioTemplateMembershipDeleted",
    }
}

impl DomainEvent {
    /// Creates a Created event.
    pub fn created(entity: Entity) -> Self {
        Self::Created { entity }
    }

    /// Creates an Updated event.
    pub fn updated(entity: Entity, changed_fields: Vec<String>) -> Self {
        Self::Updated {
            entity,
            changed_fields,
        }
    }

    /// Creates a Deleted event from the last known state of the row.
    pub fn deleted(entity: &Entity) -> Self {
        Self::Deleted {
            key: entity.key(),
            scope: entity.scope(),
        }
    }

    pub fn operation(&self) -> ChangeOperation {
        match self {
            DomainEvent::Created { .. } => ChangeOperation::Created,
            DomainEvent::Updated { .. } => ChangeOperation::Updated,
            DomainEvent::Deleted { .. } => ChangeOperation::Deleted,
        }
    }

    pub fn key(&self) -> EntityKey {
        match self {
            DomainEvent::Created { entity } | DomainEvent::Updated { entity, .. } => entity.key(),
            DomainEvent::Deleted { key, .. } => *key,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.key().kind
    }

    pub fn id(&self) -> Uuid {
        self.key().id
    }

    pub fn shape(&self) -> EventShape {
        EventShape::new(self.kind(), self.operation())
    }

    pub fn name(&self) -> &'static str {
        self.shape().name()
    }

    pub fn scope(&self) -> OwnershipScope {
        match self {
            DomainEvent::Created { entity } | DomainEvent::Updated { entity, .. } => {
                entity.scope()
            }
            DomainEvent::Deleted { scope, .. } => *scope,
        }
    }

    /// Post-mutation state. `None` for deletions.
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            DomainEvent::Created { entity } | DomainEvent::Updated { entity, .. } => Some(entity),
            DomainEvent::Deleted { .. } => None,
        }
    }

    pub fn changed_fields(&self) -> &[String] {
        match self {
            DomainEvent::Updated { changed_fields, .. } => changed_fields,
            _ => &[],
        }
    }

    pub fn has_changed(&self, field: &str) -> bool {
        self.changed_fields().iter().any(|f| f == field)
    }
}

impl From<LedgerEntry> for DomainEvent {
    fn from(entry: LedgerEntry) -> Self {
        let (entity, operation, changed_fields) = entry.into_parts();
        match operation {
            ChangeOperation::Created => DomainEvent::created(entity),
            ChangeOperation::Updated => DomainEvent::updated(entity, changed_fields),
            ChangeOperation::Deleted => DomainEvent::deleted(&entity),
        }
    }
}
