//! Dirty-flag propagation.
//!
//! Runs at flush time over the staged batch. Task changes that affect scoring
//! mark the owning scenarios and scenario templates as needing a recompute.
//! The flag update is appended to the same batch, after the task change that
//! caused it, so it is captured and published with the same commit.

use std::collections::BTreeSet;

use log::debug;
use uuid::Uuid;

use crate::changes::{ChangeOperation, PendingChange};
use crate::entities::{fields, Entity, EntityKey};
use crate::errors::{DatabaseError, Result};
use crate::tasks::Task;
use crate::unit_of_work::StoreSession;

/// Task fields whose change invalidates the owner's score totals.
pub const SCORE_RELEVANT_FIELDS: [&str; 4] = [
    fields::SCORE,
    fields::SCENARIO_ID,
    fields::SCENARIO_TEMPLATE_ID,
    fields::TRIGGER_CONDITION,
];

/// Aggregates that must be marked dirty for one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirtyTargets {
    pub scenario_ids: BTreeSet<Uuid>,
    pub template_ids: BTreeSet<Uuid>,
}

impl DirtyTargets {
    pub fn is_empty(&self) -> bool {
        self.scenario_ids.is_empty() && self.template_ids.is_empty()
    }

    fn collect(&mut self, task: &Task) {
        if let Some(id) = task.scenario_id {
            self.scenario_ids.insert(id);
        }
        if let Some(id) = task.scenario_template_id {
            self.template_ids.insert(id);
        }
    }

    /// Scenario keys first, then template keys, each in id order.
    pub fn keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.scenario_ids
            .iter()
            .map(|id| EntityKey::scenario(*id))
            .chain(
                self.template_ids
                    .iter()
                    .map(|id| EntityKey::scenario_template(*id)),
            )
    }
}

/// Collects the aggregates referenced by score-relevant task changes.
///
/// Updates contribute both the previous and the new owner so a task moved
/// between aggregates leaves neither total stale.
pub fn plan_dirty_targets(batch: &[PendingChange]) -> DirtyTargets {
    let mut targets = DirtyTargets::default();
    for change in batch {
        let Some(task) = change.entity.as_task() else {
            continue;
        };
        match change.operation {
            ChangeOperation::Created | ChangeOperation::Deleted if task.score > 0 => {
                targets.collect(task);
            }
            ChangeOperation::Updated if change.touches_any(&SCORE_RELEVANT_FIELDS) => {
                targets.collect(task);
                if let Some(previous) = change.original.as_ref().and_then(Entity::as_task) {
                    targets.collect(previous);
                }
            }
            _ => {}
        }
    }
    targets
}

/// Marks every aggregate referenced by `batch` as dirty.
///
/// Aggregates already staged in the batch are flagged in place; the rest are
/// loaded through `session` and appended as updates. Returns the number of
/// aggregates whose flag changed.
pub async fn propagate_dirty_flags(
    session: &mut dyn StoreSession,
    batch: &mut Vec<PendingChange>,
) -> Result<usize> {
    let targets = plan_dirty_targets(batch);
    if targets.is_empty() {
        return Ok(0);
    }

    let mut marked = 0;
    for key in targets.keys().collect::<Vec<_>>() {
        if let Some(staged) = batch.iter_mut().rev().find(|c| c.key() == key) {
            if mark_staged(staged) {
                marked += 1;
            }
            continue;
        }

        let stored = session.find(key).await?.ok_or_else(|| {
            DatabaseError::NotFound(format!("{} referenced by a task change", key))
        })?;
        let mut flagged = stored.clone();
        if flagged.mark_scores_dirty() {
            if let Some(change) = PendingChange::updated(stored, flagged) {
                batch.push(change);
                marked += 1;
            }
        }
    }

    if marked > 0 {
        debug!("Marked {} aggregate(s) for score recompute", marked);
    }
    Ok(marked)
}

fn mark_staged(staged: &mut PendingChange) -> bool {
    match staged.operation {
        ChangeOperation::Deleted => false,
        ChangeOperation::Created => staged.entity.mark_scores_dirty(),
        ChangeOperation::Updated => {
            if !staged.entity.mark_scores_dirty() {
                return false;
            }
            staged.mark_field_changed(fields::UPDATE_SCORES);
            true
        }
    }
}
