//! Scenario and scenario template domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{fields, FieldDiff};
use crate::errors::ValidationError;

/// Lifecycle state of a scenario.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    #[default]
    Draft,
    Ready,
    Active,
    Paused,
    Ended,
    Archived,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Draft => "draft",
            ScenarioStatus::Ready => "ready",
            ScenarioStatus::Active => "active",
            ScenarioStatus::Paused => "paused",
            ScenarioStatus::Ended => "ended",
            ScenarioStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ScenarioStatus::Draft),
            "ready" => Ok(ScenarioStatus::Ready),
            "active" => Ok(ScenarioStatus::Active),
            "paused" => Ok(ScenarioStatus::Paused),
            "ended" => Ok(ScenarioStatus::Ended),
            "archived" => Ok(ScenarioStatus::Archived),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown scenario status '{}'",
                other
            ))),
        }
    }
}

/// Reusable blueprint from which scenarios are instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_hours: Option<i32>,
    pub score: i32,
    pub score_earned: i32,
    /// Dirty flag: the score totals are stale and must be recomputed.
    pub update_scores: bool,
    pub created_by: Option<Uuid>,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl ScenarioTemplate {
    pub fn changed_fields(&self, previous: &Self) -> Vec<String> {
        FieldDiff::default()
            .field(fields::NAME, &previous.name, &self.name)
            .field(fields::DESCRIPTION, &previous.description, &self.description)
            .field(fields::DURATION_HOURS, &previous.duration_hours, &self.duration_hours)
            .field(fields::SCORE, &previous.score, &self.score)
            .field(fields::SCORE_EARNED, &previous.score_earned, &self.score_earned)
            .field(fields::UPDATE_SCORES, &previous.update_scores, &self.update_scores)
            .field(fields::CREATED_BY, &previous.created_by, &self.created_by)
            .field(fields::DATE_MODIFIED, &previous.date_modified, &self.date_modified)
            .finish()
    }
}

/// A running (or runnable) exercise instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ScenarioStatus,
    pub on_demand: bool,
    pub scenario_template_id: Option<Uuid>,
    pub view_id: Option<Uuid>,
    pub score: i32,
    pub score_earned: i32,
    /// Dirty flag: the score totals are stale and must be recomputed.
    pub update_scores: bool,
    pub created_by: Option<Uuid>,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl Scenario {
    pub fn changed_fields(&self, previous: &Self) -> Vec<String> {
        FieldDiff::default()
            .field(fields::NAME, &previous.name, &self.name)
            .field(fields::DESCRIPTION, &previous.description, &self.description)
            .field(fields::START_DATE, &previous.start_date, &self.start_date)
            .field(fields::END_DATE, &previous.end_date, &self.end_date)
            .field(fields::STATUS, &previous.status, &self.status)
            .field(fields::ON_DEMAND, &previous.on_demand, &self.on_demand)
            .field(
                fields::SCENARIO_TEMPLATE_ID,
                &previous.scenario_template_id,
                &self.scenario_template_id,
            )
            .field(fields::VIEW_ID, &previous.view_id, &self.view_id)
            .field(fields::SCORE, &previous.score, &self.score)
            .field(fields::SCORE_EARNED, &previous.score_earned, &self.score_earned)
            .field(fields::UPDATE_SCORES, &previous.update_scores, &self.update_scores)
            .field(fields::CREATED_BY, &previous.created_by, &self.created_by)
            .field(fields::DATE_MODIFIED, &previous.date_modified, &self.date_modified)
            .finish()
    }
}

/// A user's membership in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMembership {
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub user_id: Uuid,
    pub date_created: DateTime<Utc>,
}

impl ScenarioMembership {
    pub fn changed_fields(&self, previous: &Self) -> Vec<String> {
        FieldDiff::default()
            .field(fields::SCENARIO_ID, &previous.scenario_id, &self.scenario_id)
            .field(fields::USER_ID, &previous.user_id, &self.user_id)
            .finish()
    }
}

/// A user's membership in a scenario template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioTemplateMembership {
    pub id: Uuid,
    pub scenario_template_id: Uuid,
    pub user_id: Uuid,
    pub date_created: DateTime<Utc>,
}

impl ScenarioTemplateMembership {
    pub fn changed_fields(&self, previous: &Self) -> Vec<String> {
        FieldDiff::default()
            .field(
                fields::SCENARIO_TEMPLATE_ID,
                &previous.scenario_template_id,
                &self.scenario_template_id,
            )
            .field(fields::USER_ID, &previous.user_id, &self.user_id)
            .finish()
    }
}

/// Input model for creating a scenario template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScenarioTemplate {
    pub name: String,
    pub description: Option<String>,
    pub duration_hours: Option<i32>,
    pub created_by: Option<Uuid>,
}

/// Input model for editing a scenario template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioTemplateUpdate {
    pub name: String,
    pub description: Option<String>,
    pub duration_hours: Option<i32>,
}

/// Input model for creating a standalone scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScenario {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub on_demand: bool,
    pub view_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Input model for editing a scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioUpdate {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ScenarioStatus,
    #[serde(default)]
    pub on_demand: bool,
    pub view_id: Option<Uuid>,
}

/// Options for instantiating a scenario from a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioFromTemplate {
    /// Defaults to the template's name.
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub on_demand: bool,
    pub view_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}
