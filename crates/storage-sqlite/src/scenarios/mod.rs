//! SQLite row models for scenarios and scenario templates.

mod model;

pub use model::{
    ScenarioDB, ScenarioMembershipDB, ScenarioTemplateDB, ScenarioTemplateMembershipDB,
};
