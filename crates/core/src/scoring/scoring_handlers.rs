//! Bus handlers that trigger score recomputation.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{ScoreTarget, ScoringServiceTrait};
use crate::changes::ChangeOperation;
use crate::entities::{fields, Entity, EntityKind};
use crate::errors::Result;
use crate::events::{DomainEvent, EventHandler, EventShape, NotificationBusBuilder};

/// Shapes the scoring handlers listen to.
pub const SCORING_SHAPES: [EventShape; 3] = [
    EventShape::new(EntityKind::Scenario, ChangeOperation::Created),
    EventShape::new(EntityKind::Scenario, ChangeOperation::Updated),
    EventShape::new(EntityKind::ScenarioTemplate, ChangeOperation::Updated),
];

/// Decides whether `event` asks for a recompute.
///
/// Created aggregates qualify when they start dirty. Updated aggregates
/// qualify only when the flag is among the changed fields and is now set,
/// so clearing the flag never loops back into another recompute.
pub fn recompute_target(event: &DomainEvent) -> Option<ScoreTarget> {
    let entity = match event {
        DomainEvent::Created { entity } => entity,
        DomainEvent::Updated { entity, .. } if event.has_changed(fields::UPDATE_SCORES) => entity,
        _ => return None,
    };
    if entity.update_scores() != Some(true) {
        return None;
    }
    match entity {
        Entity::Scenario(s) => Some(ScoreTarget::Scenario(s.id)),
        Entity::ScenarioTemplate(t) => Some(ScoreTarget::ScenarioTemplate(t.id)),
        _ => None,
    }
}

/// Forwards dirty aggregates to the scoring service.
pub struct ScoringHandler {
    name: String,
    scoring: Arc<dyn ScoringServiceTrait>,
}

impl ScoringHandler {
    pub fn new(shape: EventShape, scoring: Arc<dyn ScoringServiceTrait>) -> Self {
        Self {
            name: format!("scoring:{}", shape.name()),
            scoring,
        }
    }
}

#[async_trait]
impl EventHandler for ScoringHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let Some(target) = recompute_target(event) else {
            return Ok(());
        };
        debug!("Requesting score recompute for {}", target);
        self.scoring.recompute(target).await
    }
}

/// Subscribes one scoring handler per scoring shape.
pub fn register_scoring_handlers(
    builder: NotificationBusBuilder,
    scoring: Arc<dyn ScoringServiceTrait>,
) -> NotificationBusBuilder {
    SCORING_SHAPES.into_iter().fold(builder, |builder, shape| {
        builder.subscribe(shape, Arc::new(ScoringHandler::new(shape, scoring.clone())))
    })
}
