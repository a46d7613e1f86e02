//! Lightweight transaction observers for tests and embedding.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{DomainEvent, PublishReport};
use crate::changes::LedgerEntry;
use crate::unit_of_work::TransactionObserver;

/// Observer that collects committed events and counts rollbacks.
#[derive(Clone, Default)]
pub struct MockTransactionObserver {
    events: Arc<Mutex<Vec<DomainEvent>>>,
    rollbacks: Arc<Mutex<Vec<usize>>>,
}

impl MockTransactionObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event names in publication order.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }

    /// Discarded entry counts, one per rollback.
    pub fn rollbacks(&self) -> Vec<usize> {
        self.rollbacks.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TransactionObserver for MockTransactionObserver {
    async fn on_commit(&self, entries: Vec<LedgerEntry>) -> PublishReport {
        let published = entries.len();
        if let Ok(mut events) = self.events.lock() {
            events.extend(entries.into_iter().map(DomainEvent::from));
        }
        PublishReport {
            published,
            failed: Vec::new(),
        }
    }

    fn on_rollback(&self, discarded: usize) {
        if let Ok(mut rollbacks) = self.rollbacks.lock() {
            rollbacks.push(discarded);
        }
    }
}
