//! Score totals recomputation.

use async_trait::async_trait;
use log::{debug, info};
use uuid::Uuid;

use super::{ScoreTarget, ScoringServiceTrait};
use crate::entities::Owner;
use crate::errors::{Error, Result};
use crate::scenarios::{Scenario, ScenarioTemplate};
use crate::tasks::{ResultStatus, Task, TaskResult};
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Aggregate score totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTotals {
    /// Sum of every task's score.
    pub score: i32,
    /// Sum of the scores of tasks whose most recent result succeeded.
    pub score_earned: i32,
}

/// Recomputes an aggregate's totals and clears its dirty flag.
///
/// Each call is its own unit of work, so the cleared flag is published like
/// any other update.
#[derive(Clone)]
pub struct ScoreRecalculator {
    units: UnitOfWorkFactory,
}

impl ScoreRecalculator {
    pub fn new(units: UnitOfWorkFactory) -> Self {
        Self { units }
    }

    /// Returns false when the aggregate no longer exists.
    pub async fn recalculate(&self, target: ScoreTarget) -> Result<bool> {
        let mut uow = self.units.begin().await?;
        let changed = match target {
            ScoreTarget::Scenario(id) => {
                let Some(scenario) = uow.find::<Scenario>(id).await? else {
                    debug!("Skipping recompute, {} is gone", target);
                    return Ok(false);
                };
                let totals = totals_for(&mut uow, Owner::Scenario(id)).await?;
                let mut updated = scenario.clone();
                updated.score = totals.score;
                updated.score_earned = totals.score_earned;
                updated.update_scores = false;
                uow.update(scenario, updated)
            }
            ScoreTarget::ScenarioTemplate(id) => {
                let Some(template) = uow.find::<ScenarioTemplate>(id).await? else {
                    debug!("Skipping recompute, {} is gone", target);
                    return Ok(false);
                };
                let totals = totals_for(&mut uow, Owner::ScenarioTemplate(id)).await?;
                let mut updated = template.clone();
                updated.score = totals.score;
                updated.score_earned = totals.score_earned;
                updated.update_scores = false;
                uow.update(template, updated)
            }
        };

        uow.commit().await?;
        if changed {
            info!("Recomputed score totals for {}", target);
        }
        Ok(true)
    }
}

async fn totals_for(uow: &mut UnitOfWork, owner: Owner) -> Result<ScoreTotals> {
    let tasks = uow.list_owned::<Task>(owner).await?;
    let mut totals = ScoreTotals::default();
    for task in tasks {
        totals.score = add_score(totals.score, task.score, owner)?;
        let results = uow.list_owned::<TaskResult>(Owner::Task(task.id)).await?;
        if latest_succeeded(&results) {
            totals.score_earned = add_score(totals.score_earned, task.score, owner)?;
        }
    }
    Ok(totals)
}

fn add_score(total: i32, score: i32, owner: Owner) -> Result<i32> {
    total
        .checked_add(score)
        .ok_or_else(|| Error::Scoring(format!("score total overflows for {:?}", owner)))
}

fn latest_succeeded(results: &[TaskResult]) -> bool {
    results
        .iter()
        .max_by_key(|r| r.status_date)
        .is_some_and(|r| r.status == ResultStatus::Succeeded)
}

#[async_trait]
impl ScoringServiceTrait for ScoreRecalculator {
    async fn recompute_scenario_score(&self, scenario_id: Uuid) -> Result<()> {
        self.recalculate(ScoreTarget::Scenario(scenario_id)).await?;
        Ok(())
    }

    async fn recompute_template_score(&self, template_id: Uuid) -> Result<()> {
        self.recalculate(ScoreTarget::ScenarioTemplate(template_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::entities::{fields, Entity, EntityKey};
    use crate::events::MockTransactionObserver;
    use crate::scenarios::ScenarioStatus;
    use crate::tasks::{TaskAction, TaskInput};
    use crate::unit_of_work::InMemoryStore;

    fn scenario() -> Scenario {
        Scenario {
            id: Uuid::new_v4(),
            name: "exercise".to_string(),
            description: None,
            start_date: None,
            end_date: None,
            status: ScenarioStatus::Active,
            on_demand: false,
            scenario_template_id: None,
            view_id: None,
            score: 0,
            score_earned: 0,
            update_scores: true,
            created_by: None,
            date_created: Utc::now(),
            date_modified: None,
        }
    }

    fn task(scenario_id: Uuid, score: i32) -> Task {
        Task::from_input(
            Uuid::new_v4(),
            TaskInput {
                name: "pivot".to_string(),
                scenario_id: Some(scenario_id),
                score,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    fn result(task: &Task, status: ResultStatus, age_minutes: i64) -> TaskResult {
        let at = Utc::now() - Duration::minutes(age_minutes);
        TaskResult {
            id: Uuid::new_v4(),
            task_id: Some(task.id),
            scenario_id: task.scenario_id,
            vm_id: None,
            vm_name: None,
            api_url: None,
            action: TaskAction::GuestProcessRun,
            action_parameters: "{}".to_string(),
            expected_output: None,
            actual_output: None,
            status,
            sent_date: at,
            status_date: at,
        }
    }

    #[tokio::test]
    async fn test_recalculate_writes_totals_and_clears_flag() {
        let store = InMemoryStore::new();
        let observer = MockTransactionObserver::new();
        let s = scenario();
        let solved = task(s.id, 10);
        let regressed = task(s.id, 5);
        let untouched = task(s.id, 2);
        store
            .seed::<_, Entity>([
                s.clone().into(),
                solved.clone().into(),
                regressed.clone().into(),
                untouched.clone().into(),
                result(&solved, ResultStatus::Failed, 10).into(),
                result(&solved, ResultStatus::Succeeded, 1).into(),
                result(&regressed, ResultStatus::Succeeded, 10).into(),
                result(&regressed, ResultStatus::Failed, 1).into(),
            ])
            .unwrap();

        let recalculator = ScoreRecalculator::new(UnitOfWorkFactory::new(
            Arc::new(store.clone()),
            Arc::new(observer.clone()),
        ));
        assert!(recalculator
            .recalculate(ScoreTarget::Scenario(s.id))
            .await
            .unwrap());

        let Some(Entity::Scenario(stored)) = store.get(EntityKey::scenario(s.id)) else {
            panic!("scenario missing");
        };
        assert_eq!(stored.score, 17);
        assert_eq!(stored.score_earned, 10);
        assert!(!stored.update_scores);

        let events = observer.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].has_changed(fields::UPDATE_SCORES));
    }

    #[tokio::test]
    async fn test_recalculate_overflowing_totals_is_an_error() {
        let store = InMemoryStore::new();
        let s = scenario();
        let mut first = task(s.id, 0);
        first.score = i32::MAX;
        let mut second = task(s.id, 0);
        second.score = i32::MAX;
        store
            .seed::<_, Entity>([s.clone().into(), first.into(), second.into()])
            .unwrap();

        let recalculator = ScoreRecalculator::new(UnitOfWorkFactory::new(
            Arc::new(store.clone()),
            Arc::new(MockTransactionObserver::new()),
        ));
        let err = recalculator
            .recalculate(ScoreTarget::Scenario(s.id))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Scoring(_)));
        let Some(Entity::Scenario(stored)) = store.get(EntityKey::scenario(s.id)) else {
            panic!("scenario missing");
        };
        assert!(stored.update_scores);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_recalculate_missing_aggregate_is_skipped() {
        let store = InMemoryStore::new();
        let recalculator = ScoreRecalculator::new(UnitOfWorkFactory::new(
            Arc::new(store.clone()),
            Arc::new(MockTransactionObserver::new()),
        ));
        assert!(!recalculator
            .recalculate(ScoreTarget::ScenarioTemplate(Uuid::new_v4()))
            .await
            .unwrap());
        assert_eq!(store.commit_count(), 0);
    }
}
