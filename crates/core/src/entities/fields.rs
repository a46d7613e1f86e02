//! Wire names of tracked entity fields.
//!
//! Changed-field lists carried by update events use these names, which match
//! the camelCase JSON produced for each model.

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const DURATION_HOURS: &str = "durationHours";
pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const STATUS: &str = "status";
pub const ON_DEMAND: &str = "onDemand";
pub const VIEW_ID: &str = "viewId";
pub const SCORE: &str = "score";
pub const SCORE_EARNED: &str = "scoreEarned";
/// Dirty flag on scenarios and scenario templates.
pub const UPDATE_SCORES: &str = "updateScores";
pub const CREATED_BY: &str = "createdBy";
pub const DATE_MODIFIED: &str = "dateModified";

pub const SCENARIO_ID: &str = "scenarioId";
pub const SCENARIO_TEMPLATE_ID: &str = "scenarioTemplateId";
pub const USER_ID: &str = "userId";

pub const ACTION: &str = "action";
pub const VM_MASK: &str = "vmMask";
pub const API_URL: &str = "apiUrl";
pub const ACTION_PARAMETERS: &str = "actionParameters";
pub const EXPECTED_OUTPUT: &str = "expectedOutput";
pub const EXPIRATION_SECONDS: &str = "expirationSeconds";
pub const DELAY_SECONDS: &str = "delaySeconds";
pub const INTERVAL_SECONDS: &str = "intervalSeconds";
pub const ITERATIONS: &str = "iterations";
pub const TRIGGER_TASK_ID: &str = "triggerTaskId";
pub const TRIGGER_CONDITION: &str = "triggerCondition";
pub const USER_EXECUTABLE: &str = "userExecutable";
pub const REPEATABLE: &str = "repeatable";

pub const TASK_ID: &str = "taskId";
pub const VM_ID: &str = "vmId";
pub const VM_NAME: &str = "vmName";
pub const ACTUAL_OUTPUT: &str = "actualOutput";
pub const SENT_DATE: &str = "sentDate";
pub const STATUS_DATE: &str = "statusDate";
