use std::sync::Arc;

use crate::{error::ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use rangeops_core::scenarios::{
    NewScenario, NewScenarioTemplate, Scenario, ScenarioFromTemplate, ScenarioMembership,
    ScenarioTemplate, ScenarioTemplateMembership, ScenarioTemplateUpdate, ScenarioUpdate,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipBody {
    user_id: Uuid,
}

// ===================== Templates =====================

async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(new_template): Json<NewScenarioTemplate>,
) -> ApiResult<(StatusCode, Json<ScenarioTemplate>)> {
    let template = state.scenario_service.create_template(new_template).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn get_template(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ScenarioTemplate>> {
    let template = state.scenario_service.get_template(id).await?;
    Ok(Json(template))
}

async fn update_template(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<ScenarioTemplateUpdate>,
) -> ApiResult<Json<ScenarioTemplate>> {
    let template = state.scenario_service.update_template(id, update).await?;
    Ok(Json(template))
}

async fn delete_template(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.scenario_service.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_template_membership(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<MembershipBody>,
) -> ApiResult<(StatusCode, Json<ScenarioTemplateMembership>)> {
    let membership = state
        .scenario_service
        .add_template_membership(id, body.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

async fn remove_template_membership(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.scenario_service.remove_template_membership(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===================== Scenarios =====================

async fn create_scenario(
    State(state): State<Arc<AppState>>,
    Json(new_scenario): Json<NewScenario>,
) -> ApiResult<(StatusCode, Json<Scenario>)> {
    let scenario = state.scenario_service.create_scenario(new_scenario).await?;
    Ok((StatusCode::CREATED, Json(scenario)))
}

async fn create_scenario_from_template(
    Path(template_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(options): Json<ScenarioFromTemplate>,
) -> ApiResult<(StatusCode, Json<Scenario>)> {
    let scenario = state
        .scenario_service
        .create_scenario_from_template(template_id, options)
        .await?;
    Ok((StatusCode::CREATED, Json(scenario)))
}

async fn get_scenario(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Scenario>> {
    let scenario = state.scenario_service.get_scenario(id).await?;
    Ok(Json(scenario))
}

async fn update_scenario(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<ScenarioUpdate>,
) -> ApiResult<Json<Scenario>> {
    let scenario = state.scenario_service.update_scenario(id, update).await?;
    Ok(Json(scenario))
}

async fn delete_scenario(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.scenario_service.delete_scenario(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_scenario_membership(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<MembershipBody>,
) -> ApiResult<(StatusCode, Json<ScenarioMembership>)> {
    let membership = state
        .scenario_service
        .add_scenario_membership(id, body.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

async fn remove_scenario_membership(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.scenario_service.remove_scenario_membership(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/templates", post(create_template))
        .route(
            "/templates/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/templates/{id}/memberships", post(add_template_membership))
        .route("/templates/{id}/scenarios", post(create_scenario_from_template))
        .route(
            "/template-memberships/{id}",
            delete(remove_template_membership),
        )
        .route("/scenarios", post(create_scenario))
        .route(
            "/scenarios/{id}",
            get(get_scenario).put(update_scenario).delete(delete_scenario),
        )
        .route("/scenarios/{id}/memberships", post(add_scenario_membership))
        .route(
            "/scenario-memberships/{id}",
            delete(remove_scenario_membership),
        )
}
