use std::sync::Arc;

use crate::{error::ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rangeops_core::tasks::{
    NewTaskResult, ResultStatusUpdate, Task, TaskInput, TaskOwner, TaskResult,
};
use uuid::Uuid;

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(input): Json<TaskInput>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.task_service.create_task(input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Task>> {
    let task = state.task_service.get_task(id).await?;
    Ok(Json(task))
}

async fn update_task(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(input): Json<TaskInput>,
) -> ApiResult<Json<Task>> {
    let task = state.task_service.update_task(id, input).await?;
    Ok(Json(task))
}

async fn delete_task(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.task_service.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_task(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(owner): Json<TaskOwner>,
) -> ApiResult<Json<Task>> {
    let task = state.task_service.move_task(id, owner).await?;
    Ok(Json(task))
}

async fn record_result(
    State(state): State<Arc<AppState>>,
    Json(new_result): Json<NewTaskResult>,
) -> ApiResult<(StatusCode, Json<TaskResult>)> {
    let result = state.task_service.record_result(new_result).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn update_result_status(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<ResultStatusUpdate>,
) -> ApiResult<Json<TaskResult>> {
    let result = state.task_service.update_result_status(id, update).await?;
    Ok(Json(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/owner", put(move_task))
        .route("/results", post(record_result))
        .route("/results/{id}/status", put(update_result_status))
}
