//! Wiring of the change-capture pipeline.
//!
//! store -> unit of work -> commit-gated publisher -> notification bus ->
//! {scoring handlers, broadcast handlers}

use std::sync::Arc;

use crate::broadcast::{register_broadcast_handlers, RealtimeChannel};
use crate::events::{CommitGatedPublisher, NotificationBus};
use crate::scenarios::ScenarioService;
use crate::scoring::{register_scoring_handlers, ScoreRecalculator, ScoringServiceTrait};
use crate::tasks::TaskService;
use crate::unit_of_work::{Store, UnitOfWorkFactory};

/// Fully wired pipeline sharing one store and one bus.
#[derive(Clone)]
pub struct Pipeline {
    units: UnitOfWorkFactory,
}

impl Pipeline {
    /// Builds the bus once: scoring handlers first, then broadcast handlers.
    pub fn new(
        store: Arc<dyn Store>,
        scoring: Arc<dyn ScoringServiceTrait>,
        channel: Arc<dyn RealtimeChannel>,
    ) -> Self {
        let builder = register_scoring_handlers(NotificationBus::builder(), scoring);
        let bus = register_broadcast_handlers(builder, channel).build();
        let publisher = Arc::new(CommitGatedPublisher::new(Arc::new(bus)));
        Self {
            units: UnitOfWorkFactory::new(store, publisher),
        }
    }

    pub fn units(&self) -> &UnitOfWorkFactory {
        &self.units
    }

    pub fn task_service(&self) -> TaskService {
        TaskService::new(self.units.clone())
    }

    pub fn scenario_service(&self) -> ScenarioService {
        ScenarioService::new(self.units.clone())
    }

    /// Recalculator whose commits flow through this pipeline's bus.
    pub fn score_recalculator(&self) -> ScoreRecalculator {
        ScoreRecalculator::new(self.units.clone())
    }
}
