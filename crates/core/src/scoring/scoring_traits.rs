use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;

/// An aggregate whose score totals must be recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum ScoreTarget {
    Scenario(Uuid),
    ScenarioTemplate(Uuid),
}

impl fmt::Display for ScoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreTarget::Scenario(id) => write!(f, "Scenario {}", id),
            ScoreTarget::ScenarioTemplate(id) => write!(f, "ScenarioTemplate {}", id),
        }
    }
}

/// Score recomputation collaborator.
///
/// Calls are idempotent. Implementations may run the work inline or queue it.
#[async_trait]
pub trait ScoringServiceTrait: Send + Sync {
    async fn recompute_scenario_score(&self, scenario_id: Uuid) -> Result<()>;

    async fn recompute_template_score(&self, template_id: Uuid) -> Result<()>;

    async fn recompute(&self, target: ScoreTarget) -> Result<()> {
        match target {
            ScoreTarget::Scenario(id) => self.recompute_scenario_score(id).await,
            ScoreTarget::ScenarioTemplate(id) => self.recompute_template_score(id).await,
        }
    }
}

/// Scoring service that only records what it was asked to do.
#[derive(Clone, Default)]
pub struct MockScoringService {
    requests: Arc<Mutex<Vec<ScoreTarget>>>,
}

impl MockScoringService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ScoreTarget> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, target: ScoreTarget) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(target);
        }
    }
}

#[async_trait]
impl ScoringServiceTrait for MockScoringService {
    async fn recompute_scenario_score(&self, scenario_id: Uuid) -> Result<()> {
        self.record(ScoreTarget::Scenario(scenario_id));
        Ok(())
    }

    async fn recompute_template_score(&self, template_id: Uuid) -> Result<()> {
        self.record(ScoreTarget::ScenarioTemplate(template_id));
        Ok(())
    }
}
