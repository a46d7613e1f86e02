use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::tasks_model::{NewTaskResult, ResultStatus, ResultStatusUpdate, TaskInput, TaskOwner};
use super::{TaskService, TaskServiceTrait};
use crate::broadcast::MockRealtimeChannel;
use crate::entities::{fields, Entity, EntityKey, EntityKind};
use crate::errors::{Error, ValidationError};
use crate::pipeline::Pipeline;
use crate::scenarios::{Scenario, ScenarioStatus, ScenarioTemplate};
use crate::scoring::{MockScoringService, ScoreTarget};
use crate::unit_of_work::InMemoryStore;

struct Harness {
    store: InMemoryStore,
    scoring: MockScoringService,
    channel: MockRealtimeChannel,
    service: TaskService,
}

fn harness() -> Harness {
    let store = InMemoryStore::new();
    let scoring = MockScoringService::new();
    let channel = MockRealtimeChannel::new();
    let pipeline = Pipeline::new(
        Arc::new(store.clone()),
        Arc::new(scoring.clone()),
        Arc::new(channel.clone()),
    );
    Harness {
        service: pipeline.task_service(),
        store,
        scoring,
        channel,
    }
}

fn scenario() -> Scenario {
    Scenario {
        id: Uuid::new_v4(),
        name: "blue team".to_string(),
        description: None,
        start_date: None,
        end_date: None,
        status: ScenarioStatus::Active,
        on_demand: false,
        scenario_template_id: None,
        view_id: None,
        score: 0,
        score_earned: 0,
        update_scores: false,
        created_by: None,
        date_created: Utc::now(),
        date_modified: None,
    }
}

fn template() -> ScenarioTemplate {
    ScenarioTemplate {
        id: Uuid::new_v4(),
        name: "blueprint".to_string(),
        description: None,
        duration_hours: None,
        score: 0,
        score_earned: 0,
        update_scores: false,
        created_by: None,
        date_created: Utc::now(),
        date_modified: None,
    }
}

fn input(owner: TaskOwner, score: i32) -> TaskInput {
    let mut input = TaskInput {
        name: "harvest credentials".to_string(),
        score,
        ..Default::default()
    };
    match owner {
        TaskOwner::Scenario(id) => input.scenario_id = Some(id),
        TaskOwner::ScenarioTemplate(id) => input.scenario_template_id = Some(id),
        TaskOwner::Unassigned => {}
    }
    input
}

fn names(channel: &MockRealtimeChannel, group: &str) -> Vec<String> {
    channel
        .sent_to(group)
        .into_iter()
        .map(|m| m.event_name)
        .collect()
}

#[tokio::test]
async fn test_create_scored_task_marks_scenario_and_redacts_for_participants() {
    let h = harness();
    let s = scenario();
    h.store.seed([s.clone()]).unwrap();

    let task = h
        .service
        .create_task(input(TaskOwner::Scenario(s.id), 10))
        .await
        .unwrap();

    assert_eq!(h.scoring.requests(), vec![ScoreTarget::Scenario(s.id)]);
    assert_eq!(names(&h.channel, "System"), vec!["TaskCreated", "ScenarioUpdated"]);

    let participant = h.channel.sent_to(&s.id.to_string());
    assert_eq!(participant.len(), 2);
    assert_eq!(participant[0].event_name, "TaskCreated");
    assert_eq!(participant[0].payload["id"], task.id.to_string());
    assert!(participant[0].payload.get(fields::SCORE).is_none());
    assert_eq!(participant[1].event_name, "ScenarioUpdated");
}

#[tokio::test]
async fn test_description_update_does_not_dirty_scenario() {
    let h = harness();
    let s = scenario();
    h.store.seed([s.clone()]).unwrap();
    let task = h
        .service
        .create_task(input(TaskOwner::Scenario(s.id), 10))
        .await
        .unwrap();

    // The scenario is dirty from the creation; clear it as the recompute would.
    let mut cleared = s.clone();
    cleared.update_scores = false;
    h.store.seed([cleared]).unwrap();
    let before = h.scoring.requests().len();

    let mut edit = input(TaskOwner::Scenario(s.id), 10);
    edit.description = Some("use the jump box".to_string());
    let updated = h.service.update_task(task.id, edit).await.unwrap();

    assert!(updated.date_modified.is_some());
    assert_eq!(h.scoring.requests().len(), before);
    let system = names(&h.channel, "System");
    assert_eq!(system.last().map(String::as_str), Some("TaskUpdated"));
    assert_eq!(system.iter().filter(|n| *n == "ScenarioUpdated").count(), 1);
}

#[tokio::test]
async fn test_identical_update_commits_nothing() {
    let h = harness();
    let task = h
        .service
        .create_task(input(TaskOwner::Unassigned, 0))
        .await
        .unwrap();
    let commits = h.store.commit_count();

    let same = h
        .service
        .update_task(task.id, input(TaskOwner::Unassigned, 0))
        .await
        .unwrap();

    assert_eq!(same, task);
    assert_eq!(h.store.commit_count(), commits + 1);
    assert_eq!(names(&h.channel, "System"), vec!["TaskCreated"]);
}

#[tokio::test]
async fn test_move_task_dirties_both_scenarios() {
    let h = harness();
    let from = scenario();
    let to = scenario();
    h.store.seed([from.clone(), to.clone()]).unwrap();
    let task = h
        .service
        .create_task(input(TaskOwner::Scenario(from.id), 5))
        .await
        .unwrap();
    h.store.seed([from.clone()]).unwrap();

    h.service
        .move_task(task.id, TaskOwner::Scenario(to.id))
        .await
        .unwrap();

    let requests = h.scoring.requests();
    assert!(requests.ends_with(&[ScoreTarget::Scenario(from.id), ScoreTarget::Scenario(to.id)])
        || requests.ends_with(&[ScoreTarget::Scenario(to.id), ScoreTarget::Scenario(from.id)]));
    for id in [from.id, to.id] {
        let Some(Entity::Scenario(stored)) = h.store.get(EntityKey::scenario(id)) else {
            panic!("scenario missing");
        };
        assert!(stored.update_scores);
    }
}

#[tokio::test]
async fn test_move_to_missing_owner_fails_without_events() {
    let h = harness();
    let task = h
        .service
        .create_task(input(TaskOwner::Unassigned, 5))
        .await
        .unwrap();
    let sent = h.channel.sent().len();

    let err = h
        .service
        .move_task(task.id, TaskOwner::Scenario(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(h.channel.sent().len(), sent);
}

#[tokio::test]
async fn test_delete_scored_task_under_template() {
    let h = harness();
    let t = template();
    h.store.seed([t.clone()]).unwrap();
    let task = h
        .service
        .create_task(input(TaskOwner::ScenarioTemplate(t.id), 5))
        .await
        .unwrap();
    h.store.seed([t.clone()]).unwrap();

    h.service.delete_task(task.id).await.unwrap();

    assert_eq!(
        h.scoring.requests(),
        vec![
            ScoreTarget::ScenarioTemplate(t.id),
            ScoreTarget::ScenarioTemplate(t.id)
        ]
    );
    let deleted = h
        .channel
        .sent()
        .into_iter()
        .find(|m| m.event_name == "TaskDeleted")
        .unwrap();
    assert_eq!(deleted.payload, serde_json::json!({ "id": task.id }));
    assert_eq!(h.store.count(EntityKind::Task), 0);
}

#[tokio::test]
async fn test_delete_task_removes_results() {
    let h = harness();
    let task = h
        .service
        .create_task(input(TaskOwner::Unassigned, 0))
        .await
        .unwrap();
    h.service
        .record_result(NewTaskResult {
            task_id: task.id,
            ..Default::default()
        })
        .await
        .unwrap();

    h.service.delete_task(task.id).await.unwrap();
    assert_eq!(h.store.count(EntityKind::Result), 0);
}

#[tokio::test]
async fn test_result_copies_task_fields_and_scope() {
    let h = harness();
    let s = scenario();
    h.store.seed([s.clone()]).unwrap();
    let mut create = input(TaskOwner::Scenario(s.id), 0);
    create.action_parameters = Some(r#"{"path":"/etc/passwd"}"#.to_string());
    let task = h.service.create_task(create).await.unwrap();

    let result = h
        .service
        .record_result(NewTaskResult {
            task_id: task.id,
            vm_name: Some("web-01".to_string()),
            status: ResultStatus::Sent,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(result.scenario_id, Some(s.id));
    assert_eq!(result.action_parameters, task.action_parameters);
    let created = h
        .channel
        .sent_to(&s.id.to_string())
        .into_iter()
        .find(|m| m.event_name == "ResultCreated")
        .unwrap();
    assert_eq!(created.payload["actionParameters"]["path"], "/etc/passwd");
}

#[tokio::test]
async fn test_succeeded_result_marks_earned_total_stale() {
    let h = harness();
    let s = scenario();
    h.store.seed([s.clone()]).unwrap();
    let task = h
        .service
        .create_task(input(TaskOwner::Scenario(s.id), 10))
        .await
        .unwrap();
    let result = h
        .service
        .record_result(NewTaskResult {
            task_id: task.id,
            status: ResultStatus::Sent,
            ..Default::default()
        })
        .await
        .unwrap();
    h.store.seed([s.clone()]).unwrap();
    let before = h.scoring.requests().len();

    h.service
        .update_result_status(
            result.id,
            ResultStatusUpdate {
                status: ResultStatus::Succeeded,
                actual_output: Some("ok".to_string()),
            },
        )
        .await
        .unwrap();

    let requests = h.scoring.requests();
    assert_eq!(requests.len(), before + 1);
    assert_eq!(requests.last(), Some(&ScoreTarget::Scenario(s.id)));
}

#[tokio::test]
async fn test_create_rejects_two_owners() {
    let h = harness();
    let mut both = input(TaskOwner::Scenario(Uuid::new_v4()), 1);
    both.scenario_template_id = Some(Uuid::new_v4());

    let err = h.service.create_task(both).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::AmbiguousOwner)
    ));
}

#[tokio::test]
async fn test_create_rejects_score_above_limit() {
    let h = harness();
    let s = scenario();
    h.store.seed([Entity::Scenario(s.clone())]).unwrap();

    let err = h
        .service
        .create_task(input(TaskOwner::Scenario(s.id), i32::MAX))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidInput(_))
    ));
    assert_eq!(h.store.count(EntityKind::Task), 0);
    assert!(h.channel.sent().is_empty());
}
