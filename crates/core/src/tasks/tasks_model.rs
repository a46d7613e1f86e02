//! Task and task result domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{fields, FieldDiff};
use crate::constants::MAX_TASK_SCORE;
use crate::errors::ValidationError;

/// Operation a task performs against its remote targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    #[default]
    GuestProcessRun,
    GuestFileRead,
    GuestFileWrite,
    VmPowerOn,
    VmPowerOff,
    HttpGet,
    HttpPost,
    HttpPut,
    HttpDelete,
    SendWait,
}

impl TaskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::GuestProcessRun => "guest_process_run",
            TaskAction::GuestFileRead => "guest_file_read",
            TaskAction::GuestFileWrite => "guest_file_write",
            TaskAction::VmPowerOn => "vm_power_on",
            TaskAction::VmPowerOff => "vm_power_off",
            TaskAction::HttpGet => "http_get",
            TaskAction::HttpPost => "http_post",
            TaskAction::HttpPut => "http_put",
            TaskAction::HttpDelete => "http_delete",
            TaskAction::SendWait => "send_wait",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest_process_run" => Ok(TaskAction::GuestProcessRun),
            "guest_file_read" => Ok(TaskAction::GuestFileRead),
            "guest_file_write" => Ok(TaskAction::GuestFileWrite),
            "vm_power_on" => Ok(TaskAction::VmPowerOn),
            "vm_power_off" => Ok(TaskAction::VmPowerOff),
            "http_get" => Ok(TaskAction::HttpGet),
            "http_post" => Ok(TaskAction::HttpPost),
            "http_put" => Ok(TaskAction::HttpPut),
            "http_delete" => Ok(TaskAction::HttpDelete),
            "send_wait" => Ok(TaskAction::SendWait),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown task action '{}'",
                other
            ))),
        }
    }
}

/// What causes a task to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCondition {
    Time,
    Success,
    Failure,
    Completion,
    Expiration,
    #[default]
    Manual,
}

impl TriggerCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerCondition::Time => "time",
            TriggerCondition::Success => "success",
            TriggerCondition::Failure => "failure",
            TriggerCondition::Completion => "completion",
            TriggerCondition::Expiration => "expiration",
            TriggerCondition::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerCondition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(TriggerCondition::Time),
            "success" => Ok(TriggerCondition::Success),
            "failure" => Ok(TriggerCondition::Failure),
            "completion" => Ok(TriggerCondition::Completion),
            "expiration" => Ok(TriggerCondition::Expiration),
            "manual" => Ok(TriggerCondition::Manual),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown trigger condition '{}'",
                other
            ))),
        }
    }
}

/// Execution status of a task result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    #[default]
    Pending,
    Queued,
    Sent,
    Cancelled,
    Succeeded,
    Failed,
    Expired,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Pending => "pending",
            ResultStatus::Queued => "queued",
            ResultStatus::Sent => "sent",
            ResultStatus::Cancelled => "cancelled",
            ResultStatus::Succeeded => "succeeded",
            ResultStatus::Failed => "failed",
            ResultStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ResultStatus::Pending),
            "queued" => Ok(ResultStatus::Queued),
            "sent" => Ok(ResultStatus::Sent),
            "cancelled" => Ok(ResultStatus::Cancelled),
            "succeeded" => Ok(ResultStatus::Succeeded),
            "failed" => Ok(ResultStatus::Failed),
            "expired" => Ok(ResultStatus::Expired),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown result status '{}'",
                other
            ))),
        }
    }
}

/// A unit of work dispatched to remote targets.
///
/// A task belongs to at most one of a scenario or a scenario template. Its
/// `score` contributes to the owner's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub scenario_template_id: Option<Uuid>,
    pub scenario_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: TaskAction,
    pub vm_mask: Option<String>,
    pub api_url: Option<String>,
    /// JSON object stored as text.
    pub action_parameters: String,
    pub expected_output: Option<String>,
    pub expiration_seconds: i32,
    pub delay_seconds: i32,
    pub interval_seconds: i32,
    pub iterations: i32,
    pub trigger_task_id: Option<Uuid>,
    pub trigger_condition: TriggerCondition,
    pub score: i32,
    pub user_executable: bool,
    pub repeatable: bool,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl Task {
    /// Builds a new task from caller input.
    pub fn from_input(id: Uuid, input: TaskInput, now: DateTime<Utc>) -> Self {
        let mut task = Task {
            id,
            name: String::new(),
            description: None,
            scenario_template_id: None,
            scenario_id: None,
            user_id: None,
            action: TaskAction::default(),
            vm_mask: None,
            api_url: None,
            action_parameters: String::new(),
            expected_output: None,
            expiration_seconds: 0,
            delay_seconds: 0,
            interval_seconds: 0,
            iterations: 0,
            trigger_task_id: None,
            trigger_condition: TriggerCondition::default(),
            score: 0,
            user_executable: false,
            repeatable: false,
            date_created: now,
            date_modified: None,
        };
        task.apply_input(input);
        task
    }

    /// Overwrites every editable field with the caller's input.
    pub fn apply_input(&mut self, input: TaskInput) {
        self.name = input.name;
        self.description = input.description;
        self.scenario_template_id = input.scenario_template_id;
        self.scenario_id = input.scenario_id;
        self.user_id = input.user_id;
        self.action = input.action;
        self.vm_mask = input.vm_mask;
        self.api_url = input.api_url;
        self.action_parameters = input.action_parameters.unwrap_or_else(|| "{}".to_string());
        self.expected_output = input.expected_output;
        self.expiration_seconds = input.expiration_seconds;
        self.delay_seconds = input.delay_seconds;
        self.interval_seconds = input.interval_seconds;
        self.iterations = input.iterations;
        self.trigger_task_id = input.trigger_task_id;
        self.trigger_condition = input.trigger_condition;
        self.score = input.score;
        self.user_executable = input.user_executable;
        self.repeatable = input.repeatable;
    }

    pub fn changed_fields(&self, previous: &Self) -> Vec<String> {
        FieldDiff::default()
            .field(fields::NAME, &previous.name, &self.name)
            .field(fields::DESCRIPTION, &previous.description, &self.description)
            .field(
                fields::SCENARIO_TEMPLATE_ID,
                &previous.scenario_template_id,
                &self.scenario_template_id,
            )
            .field(fields::SCENARIO_ID, &previous.scenario_id, &self.scenario_id)
            .field(fields::USER_ID, &previous.user_id, &self.user_id)
            .field(fields::ACTION, &previous.action, &self.action)
            .field(fields::VM_MASK, &previous.vm_mask, &self.vm_mask)
            .field(fields::API_URL, &previous.api_url, &self.api_url)
            .field(
                fields::ACTION_PARAMETERS,
                &previous.action_parameters,
                &self.action_parameters,
            )
            .field(fields::EXPECTED_OUTPUT, &previous.expected_output, &self.expected_output)
            .field(
                fields::EXPIRATION_SECONDS,
                &previous.expiration_seconds,
                &self.expiration_seconds,
            )
            .field(fields::DELAY_SECONDS, &previous.delay_seconds, &self.delay_seconds)
            .field(fields::INTERVAL_SECONDS, &previous.interval_seconds, &self.interval_seconds)
            .field(fields::ITERATIONS, &previous.iterations, &self.iterations)
            .field(fields::TRIGGER_TASK_ID, &previous.trigger_task_id, &self.trigger_task_id)
            .field(
                fields::TRIGGER_CONDITION,
                &previous.trigger_condition,
                &self.trigger_condition,
            )
            .field(fields::SCORE, &previous.score, &self.score)
            .field(fields::USER_EXECUTABLE, &previous.user_executable, &self.user_executable)
            .field(fields::REPEATABLE, &previous.repeatable, &self.repeatable)
            .field(fields::DATE_MODIFIED, &previous.date_modified, &self.date_modified)
            .finish()
    }
}

/// The outcome of running a task against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: Uuid,
    pub task_id: Option<Uuid>,
    /// Owning scenario, copied from the task when the result is recorded.
    pub scenario_id: Option<Uuid>,
    pub vm_id: Option<Uuid>,
    pub vm_name: Option<String>,
    pub api_url: Option<String>,
    pub action: TaskAction,
    pub action_parameters: String,
    pub expected_output: Option<String>,
    pub actual_output: Option<String>,
    pub status: ResultStatus,
    pub sent_date: DateTime<Utc>,
    pub status_date: DateTime<Utc>,
}

impl TaskResult {
    pub fn changed_fields(&self, previous: &Self) -> Vec<String> {
        FieldDiff::default()
            .field(fields::TASK_ID, &previous.task_id, &self.task_id)
            .field(fields::SCENARIO_ID, &previous.scenario_id, &self.scenario_id)
            .field(fields::VM_ID, &previous.vm_id, &self.vm_id)
            .field(fields::VM_NAME, &previous.vm_name, &self.vm_name)
            .field(fields::API_URL, &previous.api_url, &self.api_url)
            .field(fields::ACTION, &previous.action, &self.action)
            .field(
                fields::ACTION_PARAMETERS,
                &previous.action_parameters,
                &self.action_parameters,
            )
            .field(fields::EXPECTED_OUTPUT, &previous.expected_output, &self.expected_output)
            .field(fields::ACTUAL_OUTPUT, &previous.actual_output, &self.actual_output)
            .field(fields::STATUS, &previous.status, &self.status)
            .field(fields::SENT_DATE, &previous.sent_date, &self.sent_date)
            .field(fields::STATUS_DATE, &previous.status_date, &self.status_date)
            .finish()
    }
}

/// Editable task fields, used for both creation and full replacement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskInput {
    pub name: String,
    pub description: Option<String>,
    pub scenario_template_id: Option<Uuid>,
    pub scenario_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: TaskAction,
    pub vm_mask: Option<String>,
    pub api_url: Option<String>,
    pub action_parameters: Option<String>,
    pub expected_output: Option<String>,
    pub expiration_seconds: i32,
    pub delay_seconds: i32,
    pub interval_seconds: i32,
    pub iterations: i32,
    pub trigger_task_id: Option<Uuid>,
    pub trigger_condition: TriggerCondition,
    pub score: i32,
    pub user_executable: bool,
    pub repeatable: bool,
}

impl TaskInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::entities::validate_name(&self.name)?;
        if self.scenario_id.is_some() && self.scenario_template_id.is_some() {
            return Err(ValidationError::AmbiguousOwner);
        }
        if self.score < 0 {
            return Err(ValidationError::InvalidInput(
                "score must not be negative".to_string(),
            ));
        }
        if self.score > MAX_TASK_SCORE {
            return Err(ValidationError::InvalidInput(format!(
                "score must not exceed {}",
                MAX_TASK_SCORE
            )));
        }
        Ok(())
    }
}

/// Where a task lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum TaskOwner {
    Scenario(Uuid),
    ScenarioTemplate(Uuid),
    Unassigned,
}

impl TaskOwner {
    pub fn of(task: &Task) -> Self {
        match (task.scenario_id, task.scenario_template_id) {
            (Some(id), _) => TaskOwner::Scenario(id),
            (None, Some(id)) => TaskOwner::ScenarioTemplate(id),
            (None, None) => TaskOwner::Unassigned,
        }
    }

    pub(crate) fn assign(self, task: &mut Task) {
        match self {
            TaskOwner::Scenario(id) => {
                task.scenario_id = Some(id);
                task.scenario_template_id = None;
            }
            TaskOwner::ScenarioTemplate(id) => {
                task.scenario_id = None;
                task.scenario_template_id = Some(id);
            }
            TaskOwner::Unassigned => {
                task.scenario_id = None;
                task.scenario_template_id = None;
            }
        }
    }
}

/// Input model for recording a task execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskResult {
    pub task_id: Uuid,
    pub vm_id: Option<Uuid>,
    pub vm_name: Option<String>,
    #[serde(default)]
    pub status: ResultStatus,
    pub actual_output: Option<String>,
}

/// Input model for a result status transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStatusUpdate {
    pub status: ResultStatus,
    pub actual_output: Option<String>,
}
