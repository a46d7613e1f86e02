//! Commit-gated event publisher.
//!
//! Receives the drained ledger of a committed unit of work, turns every entry
//! into a [`DomainEvent`] and publishes the events one by one on the
//! [`NotificationBus`]. Handler failures are logged and reported but never
//! undo the committed data change.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use uuid::Uuid;

use super::{DomainEvent, NotificationBus, PublishError};
use crate::changes::{ChangeOperation, LedgerEntry};
use crate::entities::EntityKind;
use crate::unit_of_work::TransactionObserver;

/// An event whose delivery failed for at least one handler.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDelivery {
    pub kind: EntityKind,
    pub operation: ChangeOperation,
    pub entity_id: Uuid,
    pub error: PublishError,
}

/// Outcome of publishing one committed batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    /// Events handed to the bus, successful or not.
    pub published: usize,
    pub failed: Vec<FailedDelivery>,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Publishes ledger entries once, and only once, their transaction commits.
pub struct CommitGatedPublisher {
    bus: Arc<NotificationBus>,
}

impl CommitGatedPublisher {
    pub fn new(bus: Arc<NotificationBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    /// Publishes `events` in order, continuing past failures.
    pub async fn publish_all(&self, events: Vec<DomainEvent>) -> PublishReport {
        let mut report = PublishReport::default();
        for event in events {
            report.published += 1;
            if let Err(e) = self.bus.publish(&event).await {
                for failure in &e.failures {
                    error!(
                        "Failed to deliver {} ({} {} {}) to '{}': {}",
                        e.event_name,
                        event.kind(),
                        event.operation(),
                        event.id(),
                        failure.handler,
                        failure.message
                    );
                }
                report.failed.push(FailedDelivery {
                    kind: event.kind(),
                    operation: event.operation(),
                    entity_id: event.id(),
                    error: e,
                });
            }
        }
        report
    }
}

#[async_trait]
impl TransactionObserver for CommitGatedPublisher {
    async fn on_commit(&self, entries: Vec<LedgerEntry>) -> PublishReport {
        if entries.is_empty() {
            return PublishReport::default();
        }
        debug!("Publishing {} event(s) for committed transaction", entries.len());
        let events = entries.into_iter().map(DomainEvent::from).collect();
        self.publish_all(events).await
    }

    fn on_rollback(&self, discarded: usize) {
        debug!(
            "Transaction rolled back, discarded {} ledger entr{}",
            discarded,
            if discarded == 1 { "y" } else { "ies" }
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::entities::Entity;
    use crate::errors::{Error, Result};
    use crate::events::{EventHandler, EventShape};
    use crate::scenarios::ScenarioMembership;
    use chrono::Utc;

    struct Recorder {
        seen: Arc<Mutex<Vec<&'static str>>>,
        fail_on: Option<EventShape>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn handle(&self, event: &DomainEvent) -> Result<()> {
            self.seen.lock().unwrap().push(event.name());
            if Some(event.shape()) == self.fail_on {
                return Err(Error::Channel("socket closed".to_string()));
            }
            Ok(())
        }
    }

    fn membership() -> Entity {
        Entity::ScenarioMembership(ScenarioMembership {
            id: Uuid::new_v4(),
            scenario_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date_created: Utc::now(),
        })
    }

    type Seen = Arc<Mutex<Vec<&'static str>>>;

    fn make_publisher(fail_on: Option<EventShape>) -> (CommitGatedPublisher, Seen) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = NotificationBus::builder();
        for operation in ChangeOperation::ALL {
            builder = builder.subscribe(
                EventShape::new(EntityKind::ScenarioMembership, operation),
                Arc::new(Recorder {
                    seen: seen.clone(),
                    fail_on,
                }),
            );
        }
        (CommitGatedPublisher::new(Arc::new(builder.build())), seen)
    }

    #[tokio::test]
    async fn test_on_commit_publishes_in_ledger_order() {
        let (publisher, seen) = make_publisher(None);
        let entity = membership();
        let entries = vec![
            LedgerEntry::new(entity.clone(), ChangeOperation::Created, vec![]),
            LedgerEntry::new(entity, ChangeOperation::Deleted, vec![]),
        ];

        let report = publisher.on_commit(entries).await;
        assert_eq!(report.published, 2);
        assert!(report.is_clean());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["ScenarioMembershipCreated", "ScenarioMembershipDeleted"]
        );
    }

    #[tokio::test]
    async fn test_failed_event_does_not_stop_the_batch() {
        let (publisher, seen) = make_publisher(Some(EventShape::new(
            EntityKind::ScenarioMembership,
            ChangeOperation::Created,
        )));
        let first = membership();
        let entries = vec![
            LedgerEntry::new(first.clone(), ChangeOperation::Created, vec![]),
            LedgerEntry::new(membership(), ChangeOperation::Deleted, vec![]),
        ];

        let report = publisher.on_commit(entries).await;
        assert_eq!(report.published, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].entity_id, first.id());
        assert_eq!(report.failed[0].operation, ChangeOperation::Created);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rollback_publishes_nothing() {
        let (publisher, seen) = make_publisher(None);
        publisher.on_rollback(3);
        assert!(seen.lock().unwrap().is_empty());
    }
}
