use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use uuid::Uuid;

use super::scenarios_model::{
    NewScenario, NewScenarioTemplate, Scenario, ScenarioFromTemplate, ScenarioMembership,
    ScenarioStatus, ScenarioTemplate, ScenarioTemplateMembership, ScenarioTemplateUpdate,
    ScenarioUpdate,
};
use super::scenarios_traits::ScenarioServiceTrait;
use crate::entities::{validate_name, Owner};
use crate::errors::{DatabaseError, Result, ValidationError};
use crate::tasks::{Task, TaskResult};
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Service for scenarios, scenario templates and their memberships.
pub struct ScenarioService {
    units: UnitOfWorkFactory,
}

impl ScenarioService {
    pub fn new(units: UnitOfWorkFactory) -> Self {
        Self { units }
    }
}

fn validate_window(
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(ValidationError::InvalidInput(
                "endDate must not be before startDate".to_string(),
            )
            .into());
        }
    }
    Ok(())
}

/// Stages the removal of tasks and every result that hangs off them.
async fn remove_tasks(uow: &mut UnitOfWork, owner: Owner) -> Result<usize> {
    let tasks = uow.list_owned::<Task>(owner).await?;
    let mut results = BTreeMap::new();
    if let Owner::Scenario(_) = owner {
        for result in uow.list_owned::<TaskResult>(owner).await? {
            results.insert(result.id, result);
        }
    }
    for task in &tasks {
        for result in uow.list_owned::<TaskResult>(Owner::Task(task.id)).await? {
            results.insert(result.id, result);
        }
    }

    for result in results.into_values() {
        uow.remove(result);
    }
    let count = tasks.len();
    for task in tasks {
        uow.remove(task);
    }
    Ok(count)
}

#[async_trait]
impl ScenarioServiceTrait for ScenarioService {
    async fn create_template(&self, new_template: NewScenarioTemplate) -> Result<ScenarioTemplate> {
        validate_name(&new_template.name)?;
        let template = ScenarioTemplate {
            id: Uuid::new_v4(),
            name: new_template.name,
            description: new_template.description,
            duration_hours: new_template.duration_hours,
            score: 0,
            score_earned: 0,
            update_scores: false,
            created_by: new_template.created_by,
            date_created: Utc::now(),
            date_modified: None,
        };

        let mut uow = self.units.begin().await?;
        uow.add(template.clone());
        uow.commit().await?;
        Ok(template)
    }

    async fn update_template(
        &self,
        template_id: Uuid,
        update: ScenarioTemplateUpdate,
    ) -> Result<ScenarioTemplate> {
        validate_name(&update.name)?;
        let mut uow = self.units.begin().await?;
        let existing = uow.get::<ScenarioTemplate>(template_id).await?;

        let mut updated = existing.clone();
        updated.name = update.name;
        updated.description = update.description;
        updated.duration_hours = update.duration_hours;
        if updated.changed_fields(&existing).is_empty() {
            uow.rollback().await?;
            return Ok(existing);
        }
        updated.date_modified = Some(Utc::now());

        uow.update(existing, updated.clone());
        uow.commit().await?;
        Ok(updated)
    }

    async fn delete_template(&self, template_id: Uuid) -> Result<()> {
        let mut uow = self.units.begin().await?;
        let template = uow.get::<ScenarioTemplate>(template_id).await?;
        let owner = Owner::ScenarioTemplate(template_id);

        let tasks = remove_tasks(&mut uow, owner).await?;
        for membership in uow.list_owned::<ScenarioTemplateMembership>(owner).await? {
            uow.remove(membership);
        }
        let now = Utc::now();
        for scenario in uow.list_owned::<Scenario>(owner).await? {
            let mut detached = scenario.clone();
            detached.scenario_template_id = None;
            detached.date_modified = Some(now);
            uow.update(scenario, detached);
        }
        uow.remove(template);

        let receipt = uow.commit().await?;
        info!(
            "Deleted scenario template {} with {} task(s), {} event(s)",
            template_id, tasks, receipt.events
        );
        Ok(())
    }

    async fn get_template(&self, template_id: Uuid) -> Result<ScenarioTemplate> {
        let mut uow = self.units.begin().await?;
        let template = uow.get::<ScenarioTemplate>(template_id).await?;
        uow.rollback().await?;
        Ok(template)
    }

    async fn create_scenario(&self, new_scenario: NewScenario) -> Result<Scenario> {
        validate_name(&new_scenario.name)?;
        validate_window(new_scenario.start_date, new_scenario.end_date)?;
        let scenario = Scenario {
            id: Uuid::new_v4(),
            name: new_scenario.name,
            description: new_scenario.description,
            start_date: new_scenario.start_date,
            end_date: new_scenario.end_date,
            status: ScenarioStatus::Draft,
            on_demand: new_scenario.on_demand,
            scenario_template_id: None,
            view_id: new_scenario.view_id,
            score: 0,
            score_earned: 0,
            update_scores: false,
            created_by: new_scenario.created_by,
            date_created: Utc::now(),
            date_modified: None,
        };

        let mut uow = self.units.begin().await?;
        uow.add(scenario.clone());
        uow.commit().await?;
        Ok(scenario)
    }

    async fn update_scenario(&self, scenario_id: Uuid, update: ScenarioUpdate) -> Result<Scenario> {
        validate_name(&update.name)?;
        validate_window(update.start_date, update.end_date)?;
        let mut uow = self.units.begin().await?;
        let existing = uow.get::<Scenario>(scenario_id).await?;

        let mut updated = existing.clone();
        updated.name = update.name;
        updated.description = update.description;
        updated.start_date = update.start_date;
        updated.end_date = update.end_date;
        updated.status = update.status;
        updated.on_demand = update.on_demand;
        updated.view_id = update.view_id;
        if updated.changed_fields(&existing).is_empty() {
            uow.rollback().await?;
            return Ok(existing);
        }
        updated.date_modified = Some(Utc::now());

        uow.update(existing, updated.clone());
        uow.commit().await?;
        Ok(updated)
    }

    async fn delete_scenario(&self, scenario_id: Uuid) -> Result<()> {
        let mut uow = self.units.begin().await?;
        let scenario = uow.get::<Scenario>(scenario_id).await?;
        let owner = Owner::Scenario(scenario_id);

        let tasks = remove_tasks(&mut uow, owner).await?;
        for membership in uow.list_owned::<ScenarioMembership>(owner).await? {
            uow.remove(membership);
        }
        uow.remove(scenario);

        let receipt = uow.commit().await?;
        info!(
            "Deleted scenario {} with {} task(s), {} event(s)",
            scenario_id, tasks, receipt.events
        );
        Ok(())
    }

    async fn get_scenario(&self, scenario_id: Uuid) -> Result<Scenario> {
        let mut uow = self.units.begin().await?;
        let scenario = uow.get::<Scenario>(scenario_id).await?;
        uow.rollback().await?;
        Ok(scenario)
    }

    async fn create_scenario_from_template(
        &self,
        template_id: Uuid,
        options: ScenarioFromTemplate,
    ) -> Result<Scenario> {
        validate_window(options.start_date, options.end_date)?;
        let mut uow = self.units.begin().await?;
        let template = uow.get::<ScenarioTemplate>(template_id).await?;
        let tasks = uow
            .list_owned::<Task>(Owner::ScenarioTemplate(template_id))
            .await?;

        let now = Utc::now();
        let end_date = options.end_date.or_else(|| {
            let start = options.start_date?;
            let hours = template.duration_hours?;
            Some(start + Duration::hours(i64::from(hours)))
        });
        let scenario = Scenario {
            id: Uuid::new_v4(),
            name: options.name.unwrap_or_else(|| template.name.clone()),
            description: template.description.clone(),
            start_date: options.start_date,
            end_date,
            status: ScenarioStatus::Ready,
            on_demand: options.on_demand,
            scenario_template_id: Some(template.id),
            view_id: options.view_id,
            score: 0,
            score_earned: 0,
            update_scores: tasks.iter().any(|task| task.score > 0),
            created_by: options.created_by,
            date_created: now,
            date_modified: None,
        };
        validate_name(&scenario.name)?;

        let new_ids: HashMap<Uuid, Uuid> =
            tasks.iter().map(|task| (task.id, Uuid::new_v4())).collect();
        uow.add(scenario.clone());
        for task in tasks {
            let mut copy = task.clone();
            copy.id = new_ids[&task.id];
            copy.scenario_id = Some(scenario.id);
            copy.scenario_template_id = None;
            copy.trigger_task_id = task
                .trigger_task_id
                .and_then(|trigger| new_ids.get(&trigger).copied());
            copy.date_created = now;
            copy.date_modified = None;
            uow.add(copy);
        }

        debug!(
            "Creating scenario {} from template {} with {} task(s)",
            scenario.id,
            template_id,
            new_ids.len()
        );
        uow.commit().await?;
        Ok(scenario)
    }

    async fn add_scenario_membership(
        &self,
        scenario_id: Uuid,
        user_id: Uuid,
    ) -> Result<ScenarioMembership> {
        let mut uow = self.units.begin().await?;
        uow.get::<Scenario>(scenario_id).await?;
        let existing = uow
            .list_owned::<ScenarioMembership>(Owner::Scenario(scenario_id))
            .await?;
        if existing.iter().any(|m| m.user_id == user_id) {
            return Err(DatabaseError::UniqueViolation(format!(
                "user {} is already a member of scenario {}",
                user_id, scenario_id
            ))
            .into());
        }

        let membership = ScenarioMembership {
            id: Uuid::new_v4(),
            scenario_id,
            user_id,
            date_created: Utc::now(),
        };
        uow.add(membership.clone());
        uow.commit().await?;
        Ok(membership)
    }

    async fn remove_scenario_membership(&self, membership_id: Uuid) -> Result<()> {
        let mut uow = self.units.begin().await?;
        let membership = uow.get::<ScenarioMembership>(membership_id).await?;
        uow.remove(membership);
        uow.commit().await?;
        Ok(())
    }

    async fn add_template_membership(
        &self,
        template_id: Uuid,
        user_id: Uuid,
    ) -> Result<ScenarioTemplateMembership> {
        let mut uow = self.units.begin().await?;
        uow.get::<ScenarioTemplate>(template_id).await?;
        let existing = uow
            .list_owned::<ScenarioTemplateMembership>(Owner::ScenarioTemplate(template_id))
            .await?;
        if existing.iter().any(|m| m.user_id == user_id) {
            return Err(DatabaseError::UniqueViolation(format!(
                "user {} is already a member of scenario template {}",
                user_id, template_id
            ))
            .into());
        }

        let membership = ScenarioTemplateMembership {
            id: Uuid::new_v4(),
            scenario_template_id: template_id,
            user_id,
            date_created: Utc::now(),
        };
        uow.add(membership.clone());
        uow.commit().await?;
        Ok(membership)
    }

    async fn remove_template_membership(&self, membership_id: Uuid) -> Result<()> {
        let mut uow = self.units.begin().await?;
        let membership = uow.get::<ScenarioTemplateMembership>(membership_id).await?;
        uow.remove(membership);
        uow.commit().await?;
        Ok(())
    }
}
