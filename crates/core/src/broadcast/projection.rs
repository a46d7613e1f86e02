//! Entity payload projections for the realtime channel.

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::constants::UNPARSEABLE_PARAMETERS_MESSAGE;
use crate::entities::{fields, Entity};
use crate::errors::{Error, Result};
use crate::tasks::{Task, TaskAction};

/// Task view for clients that follow a scenario without administrative rights.
///
/// Leaves out everything that reveals how the task is scored or checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub scenario_template_id: Option<Uuid>,
    pub scenario_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: TaskAction,
    pub expiration_seconds: i32,
    pub delay_seconds: i32,
    pub interval_seconds: i32,
    pub iterations: i32,
    pub user_executable: bool,
    pub repeatable: bool,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            description: task.description.clone(),
            scenario_template_id: task.scenario_template_id,
            scenario_id: task.scenario_id,
            user_id: task.user_id,
            action: task.action,
            expiration_seconds: task.expiration_seconds,
            delay_seconds: task.delay_seconds,
            interval_seconds: task.interval_seconds,
            iterations: task.iterations,
            user_executable: task.user_executable,
            repeatable: task.repeatable,
            date_created: task.date_created,
            date_modified: task.date_modified,
        }
    }
}

/// Decodes a stored action-parameter blob.
///
/// Anything that is not a JSON object degrades to an error marker instead of
/// failing the message.
pub fn parse_action_parameters(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            warn!("Stored action parameters are not a JSON object, sending error marker");
            json!({ "error": UNPARSEABLE_PARAMETERS_MESSAGE })
        }
    }
}

/// Complete payload of an entity.
pub fn full_payload(entity: &Entity) -> Result<Value> {
    match entity {
        Entity::Task(task) => with_parsed_parameters(to_payload(task)?, &task.action_parameters),
        Entity::Result(result) => {
            with_parsed_parameters(to_payload(result)?, &result.action_parameters)
        }
        Entity::ScenarioTemplate(e) => to_payload(e),
        Entity::Scenario(e) => to_payload(e),
        Entity::ScenarioMembership(e) => to_payload(e),
        Entity::ScenarioTemplateMembership(e) => to_payload(e),
    }
}

pub fn redacted_task_payload(task: &Task) -> Result<Value> {
    to_payload(&TaskSummary::from(task))
}

pub fn identity_payload(id: Uuid) -> Value {
    json!({ "id": id })
}

fn with_parsed_parameters(mut payload: Value, raw: &str) -> Result<Value> {
    if let Value::Object(map) = &mut payload {
        map.insert(
            fields::ACTION_PARAMETERS.to_string(),
            parse_action_parameters(raw),
        );
    }
    Ok(payload)
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::Unexpected(format!("Failed to serialize payload: {}", e)))
}
