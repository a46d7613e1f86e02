use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use uuid::Uuid;

use super::tasks_model::{
    NewTaskResult, ResultStatus, ResultStatusUpdate, Task, TaskInput, TaskOwner, TaskResult,
};
use super::tasks_traits::TaskServiceTrait;
use crate::entities::Owner;
use crate::errors::Result;
use crate::scenarios::{Scenario, ScenarioTemplate};
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Service for managing tasks and their execution results.
pub struct TaskService {
    units: UnitOfWorkFactory,
}

impl TaskService {
    pub fn new(units: UnitOfWorkFactory) -> Self {
        Self { units }
    }
}

/// Fails with `NotFound` when the owner does not exist.
async fn ensure_owner_exists(uow: &mut UnitOfWork, owner: TaskOwner) -> Result<()> {
    match owner {
        TaskOwner::Scenario(id) => {
            uow.get::<Scenario>(id).await?;
        }
        TaskOwner::ScenarioTemplate(id) => {
            uow.get::<ScenarioTemplate>(id).await?;
        }
        TaskOwner::Unassigned => {}
    }
    Ok(())
}

/// Stages `current` with a fresh modification date when anything changed.
fn stage_task_update(uow: &mut UnitOfWork, original: Task, mut current: Task) -> Task {
    if current.changed_fields(&original).is_empty() {
        return original;
    }
    current.date_modified = Some(Utc::now());
    uow.update(original, current.clone());
    current
}

/// Raises the scenario's dirty flag when a result moves its earned total.
///
/// Result changes are not task changes, so flush-time propagation does not
/// see them.
async fn mark_earned_stale(uow: &mut UnitOfWork, result: &TaskResult) -> Result<()> {
    let (Some(task_id), Some(scenario_id)) = (result.task_id, result.scenario_id) else {
        return Ok(());
    };
    let scored = uow
        .find::<Task>(task_id)
        .await?
        .is_some_and(|task| task.score > 0);
    if !scored {
        return Ok(());
    }
    if let Some(scenario) = uow.find::<Scenario>(scenario_id).await? {
        if !scenario.update_scores {
            let mut flagged = scenario.clone();
            flagged.update_scores = true;
            uow.update(scenario, flagged);
        }
    }
    Ok(())
}

#[async_trait]
impl TaskServiceTrait for TaskService {
    async fn create_task(&self, input: TaskInput) -> Result<Task> {
        input.validate()?;
        let mut uow = self.units.begin().await?;

        let task = Task::from_input(Uuid::new_v4(), input, Utc::now());
        ensure_owner_exists(&mut uow, TaskOwner::of(&task)).await?;
        debug!("Creating task {} ({})", task.id, task.name);

        uow.add(task.clone());
        uow.commit().await?;
        Ok(task)
    }

    async fn update_task(&self, task_id: Uuid, input: TaskInput) -> Result<Task> {
        input.validate()?;
        let mut uow = self.units.begin().await?;

        let existing = uow.get::<Task>(task_id).await?;
        let mut updated = existing.clone();
        updated.apply_input(input);
        if TaskOwner::of(&updated) != TaskOwner::of(&existing) {
            ensure_owner_exists(&mut uow, TaskOwner::of(&updated)).await?;
        }

        let task = stage_task_update(&mut uow, existing, updated);
        uow.commit().await?;
        Ok(task)
    }

    async fn move_task(&self, task_id: Uuid, owner: TaskOwner) -> Result<Task> {
        let mut uow = self.units.begin().await?;
        ensure_owner_exists(&mut uow, owner).await?;

        let existing = uow.get::<Task>(task_id).await?;
        let mut moved = existing.clone();
        owner.assign(&mut moved);

        let task = stage_task_update(&mut uow, existing, moved);
        uow.commit().await?;
        Ok(task)
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        let mut uow = self.units.begin().await?;
        let task = uow.get::<Task>(task_id).await?;

        for result in uow.list_owned::<TaskResult>(Owner::Task(task_id)).await? {
            uow.remove(result);
        }
        debug!("Deleting task {}", task_id);
        uow.remove(task);
        uow.commit().await?;
        Ok(())
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Task> {
        let mut uow = self.units.begin().await?;
        let task = uow.get::<Task>(task_id).await?;
        uow.rollback().await?;
        Ok(task)
    }

    async fn record_result(&self, new_result: NewTaskResult) -> Result<TaskResult> {
        let mut uow = self.units.begin().await?;
        let task = uow.get::<Task>(new_result.task_id).await?;

        let now = Utc::now();
        let result = TaskResult {
            id: Uuid::new_v4(),
            task_id: Some(task.id),
            scenario_id: task.scenario_id,
            vm_id: new_result.vm_id,
            vm_name: new_result.vm_name,
            api_url: task.api_url.clone(),
            action: task.action,
            action_parameters: task.action_parameters.clone(),
            expected_output: task.expected_output.clone(),
            actual_output: new_result.actual_output,
            status: new_result.status,
            sent_date: now,
            status_date: now,
        };

        uow.add(result.clone());
        mark_earned_stale(&mut uow, &result).await?;
        uow.commit().await?;
        Ok(result)
    }

    async fn update_result_status(
        &self,
        result_id: Uuid,
        update: ResultStatusUpdate,
    ) -> Result<TaskResult> {
        let mut uow = self.units.begin().await?;
        let existing = uow.get::<TaskResult>(result_id).await?;

        let mut updated = existing.clone();
        updated.status = update.status;
        if update.actual_output.is_some() {
            updated.actual_output = update.actual_output;
        }
        if updated.changed_fields(&existing).is_empty() {
            uow.rollback().await?;
            return Ok(existing);
        }
        updated.status_date = Utc::now();

        let affects_earned = existing.status != updated.status
            && (existing.status == ResultStatus::Succeeded
                || updated.status == ResultStatus::Succeeded);
        uow.update(existing, updated.clone());
        if affects_earned {
            mark_earned_stale(&mut uow, &updated).await?;
        }
        uow.commit().await?;
        Ok(updated)
    }
}
