use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::scenarios_model::{
    NewScenario, NewScenarioTemplate, ScenarioFromTemplate, ScenarioStatus, ScenarioUpdate,
};
use super::{ScenarioService, ScenarioServiceTrait};
use crate::broadcast::MockRealtimeChannel;
use crate::entities::{Entity, EntityKey, EntityKind, Owner};
use crate::errors::{DatabaseError, Error};
use crate::pipeline::Pipeline;
use crate::scoring::{MockScoringService, ScoreTarget};
use crate::tasks::{NewTaskResult, Task, TaskInput, TaskServiceTrait};
use crate::unit_of_work::InMemoryStore;

struct Harness {
    store: InMemoryStore,
    scoring: MockScoringService,
    channel: MockRealtimeChannel,
    pipeline: Pipeline,
    service: ScenarioService,
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
        service: pipeline.scenario_service(),
        store,
        scoring,
        channel,
        pipeline,
    }
}

fn new_template(name: &str) -> NewScenarioTemplate {
    NewScenarioTemplate {
        name: name.to_string(),
        duration_hours: Some(8),
        ..Default::default()
    }
}

fn new_scenario(name: &str) -> NewScenario {
    NewScenario {
        name: name.to_string(),
        ..Default::default()
    }
}

fn task_input(name: &str, template_id: Uuid, score: i32) -> TaskInput {
    TaskInput {
        name: name.to_string(),
        scenario_template_id: Some(template_id),
        score,
        ..Default::default()
    }
}

fn event_names(channel: &MockRealtimeChannel) -> Vec<String> {
    channel.sent_to("System").into_iter().map(|m| m.event_name).collect()
}

#[tokio::test]
async fn test_create_template_broadcasts_to_system_and_template_group() {
    let h = harness();
    let template = h.service.create_template(new_template("phishing")).await.unwrap();

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event_name, "ScenarioTemplateCreated");
    assert_eq!(
        sent[0].groups,
        vec!["System".to_string(), template.id.to_string()]
    );
    assert!(h.scoring.requests().is_empty());
}

#[tokio::test]
async fn test_update_scenario_sets_modified_date_only_on_change() {
    let h = harness();
    let scenario = h.service.create_scenario(new_scenario("night shift")).await.unwrap();

    let unchanged = h
        .service
        .update_scenario(
            scenario.id,
            ScenarioUpdate {
                name: "night shift".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged.date_modified, None);

    let changed = h
        .service
        .update_scenario(
            scenario.id,
            ScenarioUpdate {
                name: "night shift".to_string(),
                status: ScenarioStatus::Active,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(changed.date_modified.is_some());
    assert_eq!(event_names(&h.channel), vec!["ScenarioCreated", "ScenarioUpdated"]);
}

#[tokio::test]
async fn test_scenario_window_is_validated() {
    let h = harness();
    let start = Utc::now();
    let err = h
        .service
        .create_scenario(NewScenario {
            name: "backwards".to_string(),
            start_date: Some(start),
            end_date: Some(start - Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_scenario_from_template_copies_tasks_and_starts_dirty() {
    let h = harness();
    let tasks = h.pipeline.task_service();
    let template = h.service.create_template(new_template("ransomware")).await.unwrap();
    let first = tasks
        .create_task(task_input("encrypt share", template.id, 10))
        .await
        .unwrap();
    let mut follow_up = task_input("drop note", template.id, 0);
    follow_up.trigger_task_id = Some(first.id);
    tasks.create_task(follow_up).await.unwrap();
    let requests_before = h.scoring.requests().len();

    let start = Utc::now();
    let scenario = h
        .service
        .create_scenario_from_template(
            template.id,
            ScenarioFromTemplate {
                start_date: Some(start),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(scenario.name, "ransomware");
    assert_eq!(scenario.end_date, Some(start + Duration::hours(8)));
    assert!(scenario.update_scores);

    let mut uow = h.pipeline.units().begin().await.unwrap();
    let copies = uow
        .list_owned::<Task>(Owner::Scenario(scenario.id))
        .await
        .unwrap();
    assert_eq!(copies.len(), 2);
    let copied_first = copies.iter().find(|t| t.name == "encrypt share").unwrap();
    let copied_follow_up = copies.iter().find(|t| t.name == "drop note").unwrap();
    assert_ne!(copied_first.id, first.id);
    assert_eq!(copied_follow_up.trigger_task_id, Some(copied_first.id));
    assert!(copies.iter().all(|t| t.scenario_template_id.is_none()));

    let requests = h.scoring.requests();
    assert_eq!(requests.len(), requests_before + 1);
    assert_eq!(requests.last(), Some(&ScoreTarget::Scenario(scenario.id)));
}

#[tokio::test]
async fn test_delete_scenario_cascades_without_dirty_events() {
    let h = harness();
    let tasks = h.pipeline.task_service();
    let scenario = h.service.create_scenario(new_scenario("cleanup")).await.unwrap();
    let task = tasks
        .create_task(TaskInput {
            name: "wipe logs".to_string(),
            scenario_id: Some(scenario.id),
            score: 3,
            ..Default::default()
        })
        .await
        .unwrap();
    tasks
        .record_result(NewTaskResult {
            task_id: task.id,
            ..Default::default()
        })
        .await
        .unwrap();
    h.service
        .add_scenario_membership(scenario.id, Uuid::new_v4())
        .await
        .unwrap();
    let requests_before = h.scoring.requests().len();
    let sent_before = h.channel.sent().len();

    h.service.delete_scenario(scenario.id).await.unwrap();

    for kind in EntityKind::ALL {
        assert_eq!(h.store.count(kind), 0, "{} left behind", kind);
    }
    assert_eq!(h.scoring.requests().len(), requests_before);
    let deleted: Vec<String> = h.channel.sent()[sent_before..]
        .iter()
        .map(|m| m.event_name.clone())
        .collect();
    assert_eq!(
        deleted,
        vec![
            "ResultDeleted",
            "TaskDeleted",
            "ScenarioMembershipDeleted",
            "ScenarioDeleted"
        ]
    );
}

#[tokio::test]
async fn test_delete_template_detaches_scenarios() {
    let h = harness();
    let template = h.service.create_template(new_template("recon")).await.unwrap();
    let scenario = h
        .service
        .create_scenario_from_template(template.id, ScenarioFromTemplate::default())
        .await
        .unwrap();
    h.service
        .add_template_membership(template.id, Uuid::new_v4())
        .await
        .unwrap();

    h.service.delete_template(template.id).await.unwrap();

    assert_eq!(h.store.count(EntityKind::ScenarioTemplate), 0);
    assert_eq!(h.store.count(EntityKind::ScenarioTemplateMembership), 0);
    let Some(Entity::Scenario(stored)) = h.store.get(EntityKey::scenario(scenario.id)) else {
        panic!("scenario should survive its template");
    };
    assert_eq!(stored.scenario_template_id, None);
}

#[tokio::test]
async fn test_duplicate_membership_is_rejected() {
    let h = harness();
    let scenario = h.service.create_scenario(new_scenario("shared")).await.unwrap();
    let user = Uuid::new_v4();
    let membership = h
        .service
        .add_scenario_membership(scenario.id, user)
        .await
        .unwrap();

    let err = h
        .service
        .add_scenario_membership(scenario.id, user)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Database(DatabaseError::UniqueViolation(_))
    ));

    h.service
        .remove_scenario_membership(membership.id)
        .await
        .unwrap();
    assert_eq!(h.store.count(EntityKind::ScenarioMembership), 0);
    let last = h.channel.sent().pop().unwrap();
    assert_eq!(last.event_name, "ScenarioMembershipDeleted");
    assert_eq!(
        last.groups,
        vec![scenario.id.to_string(), "System".to_string()]
    );
}
