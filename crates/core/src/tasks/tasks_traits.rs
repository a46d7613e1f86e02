//! Task service trait.

use async_trait::async_trait;
use uuid::Uuid;

use super::tasks_model::{NewTaskResult, ResultStatusUpdate, Task, TaskInput, TaskOwner, TaskResult};
use crate::errors::Result;

/// Contract for task and result mutations.
///
/// Every mutating call is one unit of work: its changes, and the dirty flags
/// they raise, are committed and published together.
#[async_trait]
pub trait TaskServiceTrait: Send + Sync {
    /// Creates a task under the owner named in `input`.
    async fn create_task(&self, input: TaskInput) -> Result<Task>;

    /// Replaces every editable field of a task.
    async fn update_task(&self, task_id: Uuid, input: TaskInput) -> Result<Task>;

    /// Re-parents a task. Both the old and the new owner become dirty when
    /// the task carries a score.
    async fn move_task(&self, task_id: Uuid, owner: TaskOwner) -> Result<Task>;

    /// Deletes a task and its results.
    async fn delete_task(&self, task_id: Uuid) -> Result<()>;

    async fn get_task(&self, task_id: Uuid) -> Result<Task>;

    /// Records one execution of a task.
    async fn record_result(&self, new_result: NewTaskResult) -> Result<TaskResult>;

    /// Moves a result to a new status.
    async fn update_result_status(
        &self,
        result_id: Uuid,
        update: ResultStatusUpdate,
    ) -> Result<TaskResult>;
}
