use std::sync::Arc;

use crate::{
    config::Config,
    events::{GroupHub, OpenGroupAccess},
    scoring::QueuedScoringService,
};
use rangeops_core::{
    pipeline::Pipeline, scenarios::ScenarioServiceTrait, tasks::TaskServiceTrait,
};
use rangeops_storage_sqlite::SqliteStore;
use tokio::task::JoinHandle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub pipeline: Pipeline,
    pub task_service: Arc<dyn TaskServiceTrait>,
    pub scenario_service: Arc<dyn ScenarioServiceTrait>,
    pub hub: GroupHub,
    pub scoring: Arc<QueuedScoringService>,
    /// Background recompute worker; `None` only if it failed to start.
    pub scoring_worker: Option<JoinHandle<()>>,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("RO_LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("text") {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    } else {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = SqliteStore::open(&config.db_path, config.db_pool_size)?;
    tracing::info!("Database path in use: {}", config.db_path);

    // Scoring service - two-phase initialization: the worker recomputes
    // through the pipeline that this service is injected into.
    let scoring = Arc::new(QueuedScoringService::new());
    let hub = GroupHub::new(config.client_queue_capacity, Arc::new(OpenGroupAccess));

    let pipeline = Pipeline::new(Arc::new(store), scoring.clone(), Arc::new(hub.clone()));
    let task_service: Arc<dyn TaskServiceTrait> = Arc::new(pipeline.task_service());
    let scenario_service: Arc<dyn ScenarioServiceTrait> = Arc::new(pipeline.scenario_service());

    let scoring_worker =
        scoring.start_worker(pipeline.score_recalculator(), config.scoring_debounce);
    if scoring_worker.is_none() {
        tracing::warn!("Score recompute worker was not started");
    }

    Ok(Arc::new(AppState {
        pipeline,
        task_service,
        scenario_service,
        hub,
        scoring,
        scoring_worker,
        db_path: config.db_path.clone(),
    }))
}
