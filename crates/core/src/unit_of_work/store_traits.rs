use async_trait::async_trait;

use crate::changes::{LedgerEntry, PendingChange};
use crate::entities::{Entity, EntityKey, EntityKind, Owner};
use crate::errors::Result;
use crate::events::PublishReport;

/// Persistence engine that hands out transactional sessions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> Result<Box<dyn StoreSession>>;
}

/// One open transaction against the persistence engine.
///
/// Reads observe the session's own applied changes. Nothing becomes visible
/// to other sessions before [`StoreSession::commit`]. Dropping a session that
/// was neither committed nor rolled back must discard its changes.
#[async_trait]
pub trait StoreSession: Send {
    async fn find(&mut self, key: EntityKey) -> Result<Option<Entity>>;

    /// Rows of `kind` that are direct children of `owner`.
    async fn list_owned(&mut self, kind: EntityKind, owner: Owner) -> Result<Vec<Entity>>;

    /// Writes one staged change.
    async fn apply(&mut self, change: &PendingChange) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}

/// Hooks the transaction lifecycle of a unit of work.
#[async_trait]
pub trait TransactionObserver: Send + Sync {
    /// Called exactly once after a successful commit with every entry the
    /// transaction recorded, in order.
    async fn on_commit(&self, entries: Vec<LedgerEntry>) -> PublishReport;

    /// Called when the transaction is abandoned.
    fn on_rollback(&self, discarded: usize);
}
