use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::*;
use crate::entities::{fields, Entity, EntityKey, EntityKind};
use crate::errors::Error;
use crate::events::{DomainEvent, MockTransactionObserver};
use crate::scenarios::{Scenario, ScenarioStatus, ScenarioTemplate};
use crate::tasks::{Task, TaskInput};

fn scenario(update_scores: bool) -> Scenario {
    Scenario {
        id: Uuid::new_v4(),
        name: "red team drill".to_string(),
        description: None,
        start_date: None,
        end_date: None,
        status: ScenarioStatus::Active,
        on_demand: false,
        scenario_template_id: None,
        view_id: None,
        score: 0,
        score_earned: 0,
        update_scores,
        created_by: None,
        date_created: Utc::now(),
        date_modified: None,
    }
}

fn template() -> ScenarioTemplate {
    ScenarioTemplate {
        id: Uuid::new_v4(),
        name: "baseline".to_string(),
        description: None,
        duration_hours: Some(4),
        score: 0,
        score_earned: 0,
        update_scores: false,
        created_by: None,
        date_created: Utc::now(),
        date_modified: None,
    }
}

fn task_in_scenario(scenario_id: Uuid, score: i32) -> Task {
    Task::from_input(
        Uuid::new_v4(),
        TaskInput {
            name: "capture flag".to_string(),
            scenario_id: Some(scenario_id),
            score,
            ..Default::default()
        },
        Utc::now(),
    )
}

fn setup() -> (InMemoryStore, MockTransactionObserver, UnitOfWorkFactory) {
    let store = InMemoryStore::new();
    let observer = MockTransactionObserver::new();
    let factory = UnitOfWorkFactory::new(Arc::new(store.clone()), Arc::new(observer.clone()));
    (store, observer, factory)
}

fn is_dirty(store: &InMemoryStore, key: EntityKey) -> bool {
    store
        .get(key)
        .and_then(|e| e.update_scores())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_scored_task_creation_marks_scenario_after_task() {
    let (store, observer, factory) = setup();
    let s = scenario(false);
    store.seed([s.clone()]).unwrap();

    let mut uow = factory.begin().await.unwrap();
    uow.add(task_in_scenario(s.id, 10));
    let receipt = uow.commit().await.unwrap();

    assert_eq!(receipt.events, 2);
    assert_eq!(observer.event_names(), vec!["TaskCreated", "ScenarioUpdated"]);
    let events = observer.events();
    assert!(events[1].has_changed(fields::UPDATE_SCORES));
    assert!(is_dirty(&store, EntityKey::scenario(s.id)));
}

#[tokio::test]
async fn test_rollback_publishes_nothing_and_keeps_store() {
    let (store, observer, factory) = setup();
    let s = scenario(false);
    store.seed([s.clone()]).unwrap();

    let mut uow = factory.begin().await.unwrap();
    uow.add(task_in_scenario(s.id, 10));
    uow.flush().await.unwrap();
    assert_eq!(uow.recorded().len(), 2);
    uow.rollback().await.unwrap();

    assert!(observer.is_empty());
    assert_eq!(observer.rollbacks(), vec![2]);
    assert_eq!(store.count(EntityKind::Task), 0);
    assert!(!is_dirty(&store, EntityKey::scenario(s.id)));
}

#[tokio::test]
async fn test_ledger_spans_multiple_flushes() {
    let (store, observer, factory) = setup();
    let s = scenario(false);
    store.seed([s.clone()]).unwrap();

    let mut uow = factory.begin().await.unwrap();
    let task = task_in_scenario(s.id, 0);
    uow.add(task.clone());
    uow.flush().await.unwrap();

    let mut edited = task.clone();
    edited.description = Some("second pass".to_string());
    assert!(uow.update(task, edited.clone()));
    uow.flush().await.unwrap();

    uow.remove(edited);
    uow.commit().await.unwrap();

    assert_eq!(
        observer.event_names(),
        vec!["TaskCreated", "TaskUpdated", "TaskDeleted"]
    );
    assert_eq!(store.count(EntityKind::Task), 0);
}

#[tokio::test]
async fn test_missing_aggregate_fails_flush_and_rolls_back() {
    let (store, observer, factory) = setup();

    let mut uow = factory.begin().await.unwrap();
    uow.add(task_in_scenario(Uuid::new_v4(), 10));
    let err = uow.commit().await.unwrap_err();

    assert!(err.is_not_found());
    assert!(observer.is_empty());
    assert_eq!(observer.rollbacks(), vec![0]);
    assert_eq!(store.commit_count(), 0);
    assert_eq!(store.count(EntityKind::Task), 0);
}

#[tokio::test]
async fn test_flush_failure_poisons_unit_of_work() {
    let (_store, _observer, factory) = setup();

    let mut uow = factory.begin().await.unwrap();
    uow.add(task_in_scenario(Uuid::new_v4(), 3));
    assert!(uow.flush().await.is_err());

    uow.add(task_in_scenario(Uuid::new_v4(), 0));
    assert!(matches!(uow.flush().await, Err(Error::TransactionClosed)));
}

#[tokio::test]
async fn test_commit_failure_publishes_nothing() {
    let (store, observer, factory) = setup();
    store.fail_next_commit();

    let mut uow = factory.begin().await.unwrap();
    uow.add(template());
    assert!(uow.commit().await.is_err());

    assert!(observer.is_empty());
    assert_eq!(observer.rollbacks(), vec![1]);
    assert_eq!(store.count(EntityKind::ScenarioTemplate), 0);
}

#[tokio::test]
async fn test_dropping_uncommitted_unit_of_work_discards_ledger() {
    let (store, observer, factory) = setup();
    {
        let mut uow = factory.begin().await.unwrap();
        uow.add(template());
        uow.flush().await.unwrap();
    }
    assert!(observer.is_empty());
    assert_eq!(observer.rollbacks(), vec![1]);
    assert_eq!(store.count(EntityKind::ScenarioTemplate), 0);

    let uow = factory.begin().await.unwrap();
    assert!(uow.recorded().is_empty());
}

#[tokio::test]
async fn test_already_dirty_aggregate_is_not_restaged() {
    let (store, observer, factory) = setup();
    let s = scenario(true);
    store.seed([s.clone()]).unwrap();

    let mut uow = factory.begin().await.unwrap();
    uow.add(task_in_scenario(s.id, 7));
    uow.commit().await.unwrap();

    assert_eq!(observer.event_names(), vec!["TaskCreated"]);
}

#[tokio::test]
async fn test_moving_task_marks_both_scenarios() {
    let (store, observer, factory) = setup();
    let from = scenario(false);
    let to = scenario(false);
    let task = task_in_scenario(from.id, 10);
    store
        .seed::<_, Entity>([from.clone().into(), to.clone().into(), task.clone().into()])
        .unwrap();

    let mut uow = factory.begin().await.unwrap();
    let mut moved = task.clone();
    moved.scenario_id = Some(to.id);
    uow.update(task, moved);
    uow.commit().await.unwrap();

    let names = observer.event_names();
    assert_eq!(names, vec!["TaskUpdated", "ScenarioUpdated", "ScenarioUpdated"]);
    let flagged: Vec<Uuid> = observer
        .events()
        .iter()
        .filter(|e| e.has_changed(fields::UPDATE_SCORES))
        .map(DomainEvent::id)
        .collect();
    assert_eq!(flagged.len(), 2);
    assert!(flagged.contains(&from.id) && flagged.contains(&to.id));
    assert!(is_dirty(&store, EntityKey::scenario(from.id)));
    assert!(is_dirty(&store, EntityKey::scenario(to.id)));
}

#[tokio::test]
async fn test_aggregate_staged_in_same_batch_is_flagged_in_place() {
    let (store, observer, factory) = setup();
    let s = scenario(false);

    let mut uow = factory.begin().await.unwrap();
    uow.add(s.clone());
    uow.add(task_in_scenario(s.id, 4));
    uow.commit().await.unwrap();

    assert_eq!(observer.event_names(), vec!["ScenarioCreated", "TaskCreated"]);
    assert!(is_dirty(&store, EntityKey::scenario(s.id)));
}

#[tokio::test]
async fn test_template_deleted_with_its_task_is_not_flagged() {
    let (store, observer, factory) = setup();
    let t = template();
    let mut task = task_in_scenario(Uuid::new_v4(), 5);
    task.scenario_id = None;
    task.scenario_template_id = Some(t.id);
    store
        .seed::<_, Entity>([t.clone().into(), task.clone().into()])
        .unwrap();

    let mut uow = factory.begin().await.unwrap();
    uow.remove(task);
    uow.remove(t);
    uow.commit().await.unwrap();

    assert_eq!(
        observer.event_names(),
        vec!["TaskDeleted", "ScenarioTemplateDeleted"]
    );
}

#[tokio::test]
async fn test_update_without_changes_stages_nothing() {
    let (_store, observer, factory) = setup();
    let t = template();

    let mut uow = factory.begin().await.unwrap();
    assert!(!uow.update(t.clone(), t));
    assert!(uow.pending().is_empty());
    let receipt = uow.commit().await.unwrap();

    assert_eq!(receipt.events, 0);
    assert!(observer.is_empty());
}

#[tokio::test]
async fn test_get_reads_own_flushed_writes() {
    let (_store, _observer, factory) = setup();
    let t = template();

    let mut uow = factory.begin().await.unwrap();
    assert!(uow.get::<ScenarioTemplate>(t.id).await.unwrap_err().is_not_found());
    uow.add(t.clone());
    uow.flush().await.unwrap();
    assert_eq!(uow.get::<ScenarioTemplate>(t.id).await.unwrap(), t);
}
