//! In-process notification bus.
//!
//! Handlers subscribe to an [`EventShape`] while the bus is being built. Once
//! built, the registry is immutable and can be shared freely across tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

use super::{DomainEvent, EventShape};
use crate::errors::Result;

/// Reacts to published domain events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    async fn handle(&self, event: &DomainEvent) -> Result<()>;
}

/// One handler that failed while an event was being published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub handler: String,
    pub message: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.handler, self.message)
    }
}

/// Every handler failure collected for a single event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} handler(s) failed for {event_name}: {}", .failures.len(), join_failures(.failures))]
pub struct PublishError {
    pub event_name: String,
    pub failures: Vec<HandlerFailure>,
}

fn join_failures(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects subscriptions before the bus is frozen.
#[derive(Default)]
pub struct NotificationBusBuilder {
    handlers: HashMap<EventShape, Vec<Arc<dyn EventHandler>>>,
}

impl NotificationBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the subscribers of `shape`.
    pub fn subscribe(mut self, shape: EventShape, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.entry(shape).or_default().push(handler);
        self
    }

    pub fn build(self) -> NotificationBus {
        NotificationBus {
            handlers: self.handlers,
        }
    }
}

/// Immutable registry of event handlers.
#[derive(Default)]
pub struct NotificationBus {
    handlers: HashMap<EventShape, Vec<Arc<dyn EventHandler>>>,
}

impl NotificationBus {
    pub fn builder() -> NotificationBusBuilder {
        NotificationBusBuilder::new()
    }

    /// Number of handlers subscribed to `shape`.
    pub fn handler_count(&self, shape: EventShape) -> usize {
        self.handlers.get(&shape).map_or(0, Vec::len)
    }

    /// Delivers `event` to every handler subscribed to its shape.
    ///
    /// Handlers run one after another in registration order. A failing
    /// handler does not stop the ones after it; all failures are returned
    /// together.
    pub async fn publish(&self, event: &DomainEvent) -> std::result::Result<(), PublishError> {
        let shape = event.shape();
        let Some(handlers) = self.handlers.get(&shape) else {
            debug!("No handlers subscribed to {}", shape.name());
            return Ok(());
        };

        let mut failures = Vec::new();
        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                warn!(
                    "Handler '{}' failed for {} {}: {}",
                    handler.name(),
                    shape.name(),
                    event.id(),
                    e
                );
                failures.push(HandlerFailure {
                    handler: handler.name().to_string(),
                    message: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PublishError {
                event_name: shape.name().to_string(),
                failures,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::changes::ChangeOperation;
    use crate::entities::{Entity, EntityKind};
    use crate::errors::Error;
    use crate::scenarios::ScenarioMembership;
    use chrono::Utc;
    use uuid::Uuid;

    struct RecordingHandler {
        name: String,
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        fn name(&self) -> &str {
            &self.name
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<()> {
            self.calls.lock().unwrap().push(self.name.clone());
            if self.fail {
                return Err(Error::Unexpected(format!("{} exploded", self.name)));
            }
            Ok(())
        }
    }

    fn handler(name: &str, calls: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<dyn EventHandler> {
        Arc::new(RecordingHandler {
            name: name.to_string(),
            calls: calls.clone(),
            fail,
        })
    }

    fn membership_created() -> DomainEvent {
        DomainEvent::created(Entity::ScenarioMembership(ScenarioMembership {
            id: Uuid::new_v4(),
            scenario_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date_created: Utc::now(),
        }))
    }

    const MEMBERSHIP_CREATED: EventShape =
        EventShape::new(EntityKind::ScenarioMembership, ChangeOperation::Created);

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let bus = NotificationBus::builder()
            .subscribe(MEMBERSHIP_CREATED, handler("first", &calls, false))
            .subscribe(MEMBERSHIP_CREATED, handler("second", &calls, false))
            .build();

        bus.publish(&membership_created()).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_later_handlers() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let bus = NotificationBus::builder()
            .subscribe(MEMBERSHIP_CREATED, handler("broken", &calls, true))
            .subscribe(MEMBERSHIP_CREATED, handler("healthy", &calls, false))
            .build();

        let err = bus.publish(&membership_created()).await.unwrap_err();
        assert_eq!(*calls.lock().unwrap(), vec!["broken", "healthy"]);
        assert_eq!(err.event_name, "ScenarioMembershipCreated");
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].handler, "broken");
    }

    #[tokio::test]
    async fn test_unsubscribed_shape_is_a_no_op() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let bus = NotificationBus::builder()
            .subscribe(
                EventShape::new(EntityKind::Task, ChangeOperation::Created),
                handler("tasks", &calls, false),
            )
            .build();

        bus.publish(&membership_created()).await.unwrap();
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(bus.handler_count(MEMBERSHIP_CREATED), 0);
    }
}
