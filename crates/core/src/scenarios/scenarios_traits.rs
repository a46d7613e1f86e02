//! Scenario service trait.

use async_trait::async_trait;
use uuid::Uuid;

use super::scenarios_model::{
    NewScenario, NewScenarioTemplate, Scenario, ScenarioFromTemplate, ScenarioMembership,
    ScenarioTemplate, ScenarioTemplateMembership, ScenarioTemplateUpdate, ScenarioUpdate,
};
use crate::errors::Result;

/// Contract for scenario, template and membership mutations.
#[async_trait]
pub trait ScenarioServiceTrait: Send + Sync {
    async fn create_template(&self, new_template: NewScenarioTemplate) -> Result<ScenarioTemplate>;

    async fn update_template(
        &self,
        template_id: Uuid,
        update: ScenarioTemplateUpdate,
    ) -> Result<ScenarioTemplate>;

    /// Deletes a template with its tasks and memberships. Scenarios created
    /// from it are detached, not deleted.
    async fn delete_template(&self, template_id: Uuid) -> Result<()>;

    async fn get_template(&self, template_id: Uuid) -> Result<ScenarioTemplate>;

    async fn create_scenario(&self, new_scenario: NewScenario) -> Result<Scenario>;

    async fn update_scenario(&self, scenario_id: Uuid, update: ScenarioUpdate) -> Result<Scenario>;

    /// Deletes a scenario with its tasks, results and memberships.
    async fn delete_scenario(&self, scenario_id: Uuid) -> Result<()>;

    async fn get_scenario(&self, scenario_id: Uuid) -> Result<Scenario>;

    /// Instantiates a scenario and copies the template's tasks into it.
    ///
    /// The scenario starts dirty when any copied task carries a score.
    async fn create_scenario_from_template(
        &self,
        template_id: Uuid,
        options: ScenarioFromTemplate,
    ) -> Result<Scenario>;

    async fn add_scenario_membership(
        &self,
        scenario_id: Uuid,
        user_id: Uuid,
    ) -> Result<ScenarioMembership>;

    async fn remove_scenario_membership(&self, membership_id: Uuid) -> Result<()>;

    async fn add_template_membership(
        &self,
        template_id: Uuid,
        user_id: Uuid,
    ) -> Result<ScenarioTemplateMembership>;

    async fn remove_template_membership(&self, membership_id: Uuid) -> Result<()>;
}
