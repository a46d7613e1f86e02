//! Database models for scenarios, templates and memberships.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rangeops_core::scenarios::{
    Scenario, ScenarioMembership, ScenarioTemplate, ScenarioTemplateMembership,
};

use crate::errors::StorageError;
use crate::utils::{id_text, naive, opt_naive, opt_utc, parse_enum, parse_id, parse_opt_id, utc};

const TEMPLATES: &str = "scenario_templates";
const SCENARIOS: &str = "scenarios";
const SCENARIO_MEMBERSHIPS: &str = "scenario_memberships";
const TEMPLATE_MEMBERSHIPS: &str = "scenario_template_memberships";

#[derive(Queryable, Selectable, Insertable, AsChangeset, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::scenario_templates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ScenarioTemplateDB {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_hours: Option<i32>,
    pub score: i32,
    pub score_earned: i32,
    pub update_scores: bool,
    pub created_by: Option<String>,
    pub date_created: NaiveDateTime,
    pub date_modified: Option<NaiveDateTime>,
}

impl From<&ScenarioTemplate> for ScenarioTemplateDB {
    fn from(t: &ScenarioTemplate) -> Self {
        Self {
            id: t.id.to_string(),
            name: t.name.clone(),
            description: t.description.clone(),
            duration_hours: t.duration_hours,
            score: t.score,
            score_earned: t.score_earned,
            update_scores: t.update_scores,
            created_by: id_text(t.created_by),
            date_created: naive(t.date_created),
            date_modified: opt_naive(t.date_modified),
        }
    }
}

impl TryFrom<ScenarioTemplateDB> for ScenarioTemplate {
    type Error = StorageError;

    fn try_from(db: ScenarioTemplateDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(TEMPLATES, &db.id)?,
            name: db.name,
            description: db.description,
            duration_hours: db.duration_hours,
            score: db.score,
            score_earned: db.score_earned,
            update_scores: db.update_scores,
            created_by: parse_opt_id(TEMPLATES, db.created_by)?,
            date_created: utc(db.date_created),
            date_modified: opt_utc(db.date_modified),
        })
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::scenarios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ScenarioDB {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub status: String,
    pub on_demand: bool,
    pub scenario_template_id: Option<String>,
    pub view_id: Option<String>,
    pub score: i32,
    pub score_earned: i32,
    pub update_scores: bool,
    pub created_by: Option<String>,
    pub date_created: NaiveDateTime,
    pub date_modified: Option<NaiveDateTime>,
}

impl From<&Scenario> for ScenarioDB {
    fn from(s: &Scenario) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            description: s.description.clone(),
            start_date: opt_naive(s.start_date),
            end_date: opt_naive(s.end_date),
            status: s.status.as_str().to_string(),
            on_demand: s.on_demand,
            scenario_template_id: id_text(s.scenario_template_id),
            view_id: id_text(s.view_id),
            score: s.score,
            score_earned: s.score_earned,
            update_scores: s.update_scores,
            created_by: id_text(s.created_by),
            date_created: naive(s.date_created),
            date_modified: opt_naive(s.date_modified),
        }
    }
}

impl TryFrom<ScenarioDB> for Scenario {
    type Error = StorageError;

    fn try_from(db: ScenarioDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(SCENARIOS, &db.id)?,
            name: db.name,
            description: db.description,
            start_date: opt_utc(db.start_date),
            end_date: opt_utc(db.end_date),
            status: parse_enum(SCENARIOS, &db.status)?,
            on_demand: db.on_demand,
            scenario_template_id: parse_opt_id(SCENARIOS, db.scenario_template_id)?,
            view_id: parse_opt_id(SCENARIOS, db.view_id)?,
            score: db.score,
            score_earned: db.score_earned,
            update_scores: db.update_scores,
            created_by: parse_opt_id(SCENARIOS, db.created_by)?,
            date_created: utc(db.date_created),
            date_modified: opt_utc(db.date_modified),
        })
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::scenario_memberships)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScenarioMembershipDB {
    pub id: String,
    pub scenario_id: String,
    pub user_id: String,
    pub date_created: NaiveDateTime,
}

impl From<&ScenarioMembership> for ScenarioMembershipDB {
    fn from(m: &ScenarioMembership) -> Self {
        Self {
            id: m.id.to_string(),
            scenario_id: m.scenario_id.to_string(),
            user_id: m.user_id.to_string(),
            date_created: naive(m.date_created),
        }
    }
}

impl TryFrom<ScenarioMembershipDB> for ScenarioMembership {
    type Error = StorageError;

    fn try_from(db: ScenarioMembershipDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(SCENARIO_MEMBERSHIPS, &db.id)?,
            scenario_id: parse_id(SCENARIO_MEMBERSHIPS, &db.scenario_id)?,
            user_id: parse_id(SCENARIO_MEMBERSHIPS, &db.user_id)?,
            date_created: utc(db.date_created),
        })
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::scenario_template_memberships)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScenarioTemplateMembershipDB {
    pub id: String,
    pub scenario_template_id: String,
    pub user_id: String,
    pub date_created: NaiveDateTime,
}

impl From<&ScenarioTemplateMembership> for ScenarioTemplateMembershipDB {
    fn from(m: &ScenarioTemplateMembership) -> Self {
        Self {
            id: m.id.to_string(),
            scenario_template_id: m.scenario_template_id.to_string(),
            user_id: m.user_id.to_string(),
            date_created: naive(m.date_created),
        }
    }
}

impl TryFrom<ScenarioTemplateMembershipDB> for ScenarioTemplateMembership {
    type Error = StorageError;

    fn try_from(db: ScenarioTemplateMembershipDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(TEMPLATE_MEMBERSHIPS, &db.id)?,
            scenario_template_id: parse_id(TEMPLATE_MEMBERSHIPS, &db.scenario_template_id)?,
            user_id: parse_id(TEMPLATE_MEMBERSHIPS, &db.user_id)?,
            date_created: utc(db.date_created),
        })
    }
}
