use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rangeops_core::errors::{Error, Result};
use rangeops_core::scoring::{ScoreRecalculator, ScoreTarget, ScoringServiceTrait};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::queue_worker::score_queue_worker;

/// Scoring service that hands requests to a background worker.
///
/// # Two-Phase Initialization
///
/// The worker recomputes through the same pipeline whose scoring handlers
/// call this service, so the service is created first with [`Self::new`] and
/// the worker is started with [`Self::start_worker`] once the pipeline
/// exists. Requests made in between are buffered.
pub struct QueuedScoringService {
    tx: mpsc::UnboundedSender<ScoreTarget>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<ScoreTarget>>>,
}

impl QueuedScoringService {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Spawns the worker. Returns `None` when it was already started.
    ///
    /// The worker keeps the pipeline alive through the recalculator, so it
    /// lives until the runtime shuts down or the handle is aborted.
    pub fn start_worker(
        &self,
        recalculator: ScoreRecalculator,
        debounce: Duration,
    ) -> Option<JoinHandle<()>> {
        let rx = self.rx.lock().ok()?.take()?;
        Some(tokio::spawn(score_queue_worker(rx, recalculator, debounce)))
    }

    fn enqueue(&self, target: ScoreTarget) -> Result<()> {
        self.tx
            .send(target)
            .map_err(|_| Error::Scoring(format!("recompute queue closed, dropped {}", target)))
    }
}

impl Default for QueuedScoringService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoringServiceTrait for QueuedScoringService {
    async fn recompute_scenario_score(&self, scenario_id: Uuid) -> Result<()> {
        self.enqueue(ScoreTarget::Scenario(scenario_id))
    }

    async fn recompute_template_score(&self, template_id: Uuid) -> Result<()> {
        self.enqueue(ScoreTarget::ScenarioTemplate(template_id))
    }
}
