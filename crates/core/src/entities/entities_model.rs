//! The closed set of tracked entity kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fields;
use crate::errors::ValidationError;
use crate::scenarios::{Scenario, ScenarioMembership, ScenarioTemplate, ScenarioTemplateMembership};
use crate::tasks::{Task, TaskResult};

/// Every entity kind whose mutations are captured and published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    ScenarioTemplate,
    Scenario,
    Task,
    Result,
    ScenarioMembership,
    ScenarioTemplateMembership,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::ScenarioTemplate,
        EntityKind::Scenario,
        EntityKind::Task,
        EntityKind::Result,
        EntityKind::ScenarioMembership,
        EntityKind::ScenarioTemplateMembership,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::ScenarioTemplate => "ScenarioTemplate",
            EntityKind::Scenario => "Scenario",
            EntityKind::Task => "Task",
            EntityKind::Result => "Result",
            EntityKind::ScenarioMembership => "ScenarioMembership",
            EntityKind::ScenarioTemplateMembership => "ScenarioTemplateMembership",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one stored row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    pub fn scenario(id: Uuid) -> Self {
        Self::new(EntityKind::Scenario, id)
    }

    pub fn scenario_template(id: Uuid) -> Self {
        Self::new(EntityKind::ScenarioTemplate, id)
    }

    pub fn task(id: Uuid) -> Self {
        Self::new(EntityKind::Task, id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// The aggregates an entity belongs to, used for realtime routing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipScope {
    pub scenario_id: Option<Uuid>,
    pub scenario_template_id: Option<Uuid>,
}

/// Parent reference used when listing owned rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    Scenario(Uuid),
    ScenarioTemplate(Uuid),
    Task(Uuid),
}

/// A tracked entity snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Entity {
    ScenarioTemplate(ScenarioTemplate),
    Scenario(Scenario),
    Task(Task),
    Result(TaskResult),
    ScenarioMembership(ScenarioMembership),
    ScenarioTemplateMembership(ScenarioTemplateMembership),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::ScenarioTemplate(_) => EntityKind::ScenarioTemplate,
            Entity::Scenario(_) => EntityKind::Scenario,
            Entity::Task(_) => EntityKind::Task,
            Entity::Result(_) => EntityKind::Result,
            Entity::ScenarioMembership(_) => EntityKind::ScenarioMembership,
            Entity::ScenarioTemplateMembership(_) => EntityKind::ScenarioTemplateMembership,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Entity::ScenarioTemplate(e) => e.id,
            Entity::Scenario(e) => e.id,
            Entity::Task(e) => e.id,
            Entity::Result(e) => e.id,
            Entity::ScenarioMembership(e) => e.id,
            Entity::ScenarioTemplateMembership(e) => e.id,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.kind(), self.id())
    }

    pub fn scope(&self) -> OwnershipScope {
        match self {
            Entity::ScenarioTemplate(e) => OwnershipScope {
                scenario_id: None,
                scenario_template_id: Some(e.id),
            },
            Entity::Scenario(e) => OwnershipScope {
                scenario_id: Some(e.id),
                scenario_template_id: None,
            },
            Entity::Task(e) => OwnershipScope {
                scenario_id: e.scenario_id,
                scenario_template_id: e.scenario_template_id,
            },
            Entity::Result(e) => OwnershipScope {
                scenario_id: e.scenario_id,
                scenario_template_id: None,
            },
            Entity::ScenarioMembership(e) => OwnershipScope {
                scenario_id: Some(e.scenario_id),
                scenario_template_id: None,
            },
            Entity::ScenarioTemplateMembership(e) => OwnershipScope {
                scenario_id: None,
                scenario_template_id: Some(e.scenario_template_id),
            },
        }
    }

    /// Lists the fields that differ from `previous`.
    ///
    /// Returns `None` when the two snapshots are of different kinds.
    pub fn changed_fields(&self, previous: &Entity) -> Option<Vec<String>> {
        match (self, previous) {
            (Entity::ScenarioTemplate(a), Entity::ScenarioTemplate(b)) => Some(a.changed_fields(b)),
            (Entity::Scenario(a), Entity::Scenario(b)) => Some(a.changed_fields(b)),
            (Entity::Task(a), Entity::Task(b)) => Some(a.changed_fields(b)),
            (Entity::Result(a), Entity::Result(b)) => Some(a.changed_fields(b)),
            (Entity::ScenarioMembership(a), Entity::ScenarioMembership(b)) => {
                Some(a.changed_fields(b))
            }
            (Entity::ScenarioTemplateMembership(a), Entity::ScenarioTemplateMembership(b)) => {
                Some(a.changed_fields(b))
            }
            _ => None,
        }
    }

    /// Reads the score dirty flag. Non-aggregates have none.
    pub fn update_scores(&self) -> Option<bool> {
        match self {
            Entity::Scenario(s) => Some(s.update_scores),
            Entity::ScenarioTemplate(t) => Some(t.update_scores),
            _ => None,
        }
    }

    /// Raises the score dirty flag.
    ///
    /// Returns true only when the flag transitioned from clear to set.
    pub fn mark_scores_dirty(&mut self) -> bool {
        let flag = match self {
            Entity::Scenario(s) => &mut s.update_scores,
            Entity::ScenarioTemplate(t) => &mut t.update_scores,
            _ => return false,
        };
        if *flag {
            return false;
        }
        *flag = true;
        true
    }

    /// True when this row is a direct child of `owner`.
    pub fn belongs_to(&self, owner: Owner) -> bool {
        match (self, owner) {
            (Entity::Task(t), Owner::Scenario(id)) => t.scenario_id == Some(id),
            (Entity::Task(t), Owner::ScenarioTemplate(id)) => t.scenario_template_id == Some(id),
            (Entity::Result(r), Owner::Task(id)) => r.task_id == Some(id),
            (Entity::Result(r), Owner::Scenario(id)) => r.scenario_id == Some(id),
            (Entity::Scenario(s), Owner::ScenarioTemplate(id)) => {
                s.scenario_template_id == Some(id)
            }
            (Entity::ScenarioMembership(m), Owner::Scenario(id)) => m.scenario_id == id,
            (Entity::ScenarioTemplateMembership(m), Owner::ScenarioTemplate(id)) => {
                m.scenario_template_id == id
            }
            _ => false,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Entity::Task(task) => Some(task),
            _ => None,
        }
    }
}

/// Typed access to one variant of [`Entity`].
pub trait EntityModel: Into<Entity> + Clone + Send + Sized + 'static {
    const KIND: EntityKind;

    fn from_entity(entity: Entity) -> Option<Self>;
}

macro_rules! entity_model {
    ($model:ty, $variant:ident) => {
        impl From<$model> for Entity {
            fn from(model: $model) -> Self {
                Entity::$variant(model)
            }
        }

        impl EntityModel for $model {
            const KIND: EntityKind = EntityKind::$variant;

            fn from_entity(entity: Entity) -> Option<Self> {
                match entity {
                    Entity::$variant(model) => Some(model),
                    _ => None,
                }
            }
        }
    };
}

entity_model!(ScenarioTemplate, ScenarioTemplate);
entity_model!(Scenario, Scenario);
entity_model!(Task, Task);
entity_model!(TaskResult, Result);
entity_model!(ScenarioMembership, ScenarioMembership);
entity_model!(ScenarioTemplateMembership, ScenarioTemplateMembership);

/// Accumulates the names of fields whose values differ between two snapshots.
#[derive(Debug, Default)]
pub(crate) struct FieldDiff {
    changed: Vec<String>,
}

impl FieldDiff {
    pub(crate) fn field<T: PartialEq>(mut self, name: &str, before: &T, after: &T) -> Self {
        if before != after {
            self.changed.push(name.to_string());
        }
        self
    }

    pub(crate) fn finish(self) -> Vec<String> {
        self.changed
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField(fields::NAME.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskInput;
    use chrono::Utc;

    fn task(score: i32) -> Task {
        Task::from_input(
            Uuid::new_v4(),
            TaskInput {
                name: "ping".to_string(),
                score,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_changed_fields_lists_only_differences() {
        let before = task(5);
        let mut after = before.clone();
        after.score = 10;
        after.description = Some("updated".to_string());

        let changed = Entity::Task(after)
            .changed_fields(&Entity::Task(before))
            .unwrap();
        assert_eq!(changed, vec![fields::DESCRIPTION, fields::SCORE]);
    }

    #[test]
    fn test_changed_fields_rejects_mismatched_kinds() {
        let membership = ScenarioMembership {
            id: Uuid::new_v4(),
            scenario_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date_created: Utc::now(),
        };
        assert!(Entity::Task(task(1))
            .changed_fields(&Entity::ScenarioMembership(membership))
            .is_none());
    }

    #[test]
    fn test_mark_scores_dirty_only_reports_transition() {
        let mut template = Entity::ScenarioTemplate(ScenarioTemplate {
            id: Uuid::new_v4(),
            name: "baseline".to_string(),
            description: None,
            duration_hours: None,
            score: 0,
            score_earned: 0,
            update_scores: false,
            created_by: None,
            date_created: Utc::now(),
            date_modified: None,
        });

        assert!(template.mark_scores_dirty());
        assert!(!template.mark_scores_dirty());
        assert_eq!(template.update_scores(), Some(true));

        let mut plain = Entity::Task(task(3));
        assert!(!plain.mark_scores_dirty());
        assert_eq!(plain.update_scores(), None);
    }

    #[test]
    fn test_task_scope_follows_owner() {
        let scenario_id = Uuid::new_v4();
        let mut t = task(1);
        t.scenario_id = Some(scenario_id);
        let scope = Entity::Task(t).scope();
        assert_eq!(scope.scenario_id, Some(scenario_id));
        assert_eq!(scope.scenario_template_id, None);
    }
}
