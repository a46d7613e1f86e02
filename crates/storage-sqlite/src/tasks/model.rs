//! Database models for tasks and task results.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rangeops_core::tasks::{Task, TaskResult};

use crate::errors::StorageError;
use crate::utils::{id_text, naive, opt_naive, opt_utc, parse_enum, parse_id, parse_opt_id, utc};

const TASKS: &str = "tasks";
const RESULTS: &str = "results";

/// Database model for tasks
#[derive(Queryable, Selectable, Insertable, AsChangeset, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct TaskDB {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub scenario_template_id: Option<String>,
    pub scenario_id: Option<String>,
    pub user_id: Option<String>,
    pub action: String,
    pub vm_mask: Option<String>,
    pub api_url: Option<String>,
    pub action_parameters: String,
    pub expected_output: Option<String>,
    pub expiration_seconds: i32,
    pub delay_seconds: i32,
    pub interval_seconds: i32,
    pub iterations: i32,
    pub trigger_task_id: Option<String>,
    pub trigger_condition: String,
    pub score: i32,
    pub user_executable: bool,
    pub repeatable: bool,
    pub date_created: NaiveDateTime,
    pub date_modified: Option<NaiveDateTime>,
}

impl From<&Task> for TaskDB {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id.to_string(),
            name: t.name.clone(),
            description: t.description.clone(),
            scenario_template_id: id_text(t.scenario_template_id),
            scenario_id: id_text(t.scenario_id),
            user_id: id_text(t.user_id),
            action: t.action.as_str().to_string(),
            vm_mask: t.vm_mask.clone(),
            api_url: t.api_url.clone(),
            action_parameters: t.action_parameters.clone(),
            expected_output: t.expected_output.clone(),
            expiration_seconds: t.expiration_seconds,
            delay_seconds: t.delay_seconds,
            interval_seconds: t.interval_seconds,
            iterations: t.iterations,
            trigger_task_id: id_text(t.trigger_task_id),
            trigger_condition: t.trigger_condition.as_str().to_string(),
            score: t.score,
            user_executable: t.user_executable,
            repeatable: t.repeatable,
            date_created: naive(t.date_created),
            date_modified: opt_naive(t.date_modified),
        }
    }
}

impl TryFrom<TaskDB> for Task {
    type Error = StorageError;

    fn try_from(db: TaskDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(TASKS, &db.id)?,
            name: db.name,
            description: db.description,
            scenario_template_id: parse_opt_id(TASKS, db.scenario_template_id)?,
            scenario_id: parse_opt_id(TASKS, db.scenario_id)?,
            user_id: parse_opt_id(TASKS, db.user_id)?,
            action: parse_enum(TASKS, &db.action)?,
            vm_mask: db.vm_mask,
            api_url: db.api_url,
            action_parameters: db.action_parameters,
            expected_output: db.expected_output,
            expiration_seconds: db.expiration_seconds,
            delay_seconds: db.delay_seconds,
            interval_seconds: db.interval_seconds,
            iterations: db.iterations,
            trigger_task_id: parse_opt_id(TASKS, db.trigger_task_id)?,
            trigger_condition: parse_enum(TASKS, &db.trigger_condition)?,
            score: db.score,
            user_executable: db.user_executable,
            repeatable: db.repeatable,
            date_created: utc(db.date_created),
            date_modified: opt_utc(db.date_modified),
        })
    }
}

/// Database model for task results
#[derive(Queryable, Selectable, Insertable, AsChangeset, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ResultDB {
    pub id: String,
    pub task_id: Option<String>,
    pub scenario_id: Option<String>,
    pub vm_id: Option<String>,
    pub vm_name: Option<String>,
    pub api_url: Option<String>,
    pub action: String,
    pub action_parameters: String,
    pub expected_output: Option<String>,
    pub actual_output: Option<String>,
    pub status: String,
    pub sent_date: NaiveDateTime,
    pub status_date: NaiveDateTime,
}

impl From<&TaskResult> for ResultDB {
    fn from(r: &TaskResult) -> Self {
        Self {
            id: r.id.to_string(),
            task_id: id_text(r.task_id),
            scenario_id: id_text(r.scenario_id),
            vm_id: id_text(r.vm_id),
            vm_name: r.vm_name.clone(),
            api_url: r.api_url.clone(),
            action: r.action.as_str().to_string(),
            action_parameters: r.action_parameters.clone(),
            expected_output: r.expected_output.clone(),
            actual_output: r.actual_output.clone(),
            status: r.status.as_str().to_string(),
            sent_date: naive(r.sent_date),
            status_date: naive(r.status_date),
        }
    }
}

impl TryFrom<ResultDB> for TaskResult {
    type Error = StorageError;

    fn try_from(db: ResultDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(RESULTS, &db.id)?,
            task_id: parse_opt_id(RESULTS, db.task_id)?,
            scenario_id: parse_opt_id(RESULTS, db.scenario_id)?,
            vm_id: parse_opt_id(RESULTS, db.vm_id)?,
            vm_name: db.vm_name,
            api_url: db.api_url,
            action: parse_enum(RESULTS, &db.action)?,
            action_parameters: db.action_parameters,
            expected_output: db.expected_output,
            actual_output: db.actual_output,
            status: parse_enum(RESULTS, &db.status)?,
            sent_date: utc(db.sent_date),
            status_date: utc(db.status_date),
        })
    }
}
