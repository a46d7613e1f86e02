//! Unit of work: one logical transaction with change capture.

use std::sync::Arc;

use log::{debug, error, warn};
use uuid::Uuid;

use super::{Store, StoreSession, TransactionObserver};
use crate::changes::{ChangeLedger, LedgerEntry, PendingChange};
use crate::entities::{Entity, EntityKey, EntityModel, Owner};
use crate::errors::{DatabaseError, Error, Result};
use crate::events::PublishReport;
use crate::scoring::propagate_dirty_flags;

/// What a successful commit produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReceipt {
    /// Number of domain events handed to the observer.
    pub events: usize,
    pub report: PublishReport,
}

/// Opens units of work that share one store and one observer.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    store: Arc<dyn Store>,
    observer: Arc<dyn TransactionObserver>,
}

impl UnitOfWorkFactory {
    pub fn new(store: Arc<dyn Store>, observer: Arc<dyn TransactionObserver>) -> Self {
        Self { store, observer }
    }

    pub async fn begin(&self) -> Result<UnitOfWork> {
        let session = self.store.begin().await?;
        Ok(UnitOfWork::new(session, self.observer.clone()))
    }
}

/// A transaction scope that records every mutation it applies.
///
/// Changes are staged with [`add`](Self::add), [`update`](Self::update) and
/// [`remove`](Self::remove), written on [`flush`](Self::flush), and published
/// through the observer only after [`commit`](Self::commit) succeeds. Any
/// number of flushes may happen before commit; the ledger keeps every entry.
///
/// Dropping an uncommitted unit of work discards its ledger and its session.
pub struct UnitOfWork {
    session: Option<Box<dyn StoreSession>>,
    pending: Vec<PendingChange>,
    ledger: ChangeLedger,
    observer: Arc<dyn TransactionObserver>,
    poisoned: bool,
}

impl UnitOfWork {
    pub fn new(session: Box<dyn StoreSession>, observer: Arc<dyn TransactionObserver>) -> Self {
        Self {
            session: Some(session),
            pending: Vec::new(),
            ledger: ChangeLedger::new(),
            observer,
            poisoned: false,
        }
    }

    /// Stages a new entity.
    pub fn add(&mut self, entity: impl Into<Entity>) {
        self.pending.push(PendingChange::created(entity.into()));
    }

    /// Stages an update computed from two snapshots of the same row.
    ///
    /// Returns false, staging nothing, when no field differs.
    pub fn update(&mut self, original: impl Into<Entity>, current: impl Into<Entity>) -> bool {
        match PendingChange::updated(original.into(), current.into()) {
            Some(change) => {
                self.pending.push(change);
                true
            }
            None => false,
        }
    }

    /// Stages a deletion. `entity` is the last known state of the row.
    pub fn remove(&mut self, entity: impl Into<Entity>) {
        self.pending.push(PendingChange::deleted(entity.into()));
    }

    /// Changes staged since the last flush.
    pub fn pending(&self) -> &[PendingChange] {
        &self.pending
    }

    /// Entries recorded by previous flushes.
    pub fn recorded(&self) -> &[LedgerEntry] {
        self.ledger.entries()
    }

    pub async fn find<T: EntityModel>(&mut self, id: Uuid) -> Result<Option<T>> {
        let key = EntityKey::new(T::KIND, id);
        let found = self.session_mut()?.find(key).await?;
        Ok(found.and_then(T::from_entity))
    }

    /// Loads a row, failing with `NotFound` when it does not exist.
    pub async fn get<T: EntityModel>(&mut self, id: Uuid) -> Result<T> {
        self.find::<T>(id).await?.ok_or_else(|| {
            Error::from(DatabaseError::NotFound(format!("{} {}", T::KIND, id)))
        })
    }

    pub async fn list_owned<T: EntityModel>(&mut self, owner: Owner) -> Result<Vec<T>> {
        let rows = self.session_mut()?.list_owned(T::KIND, owner).await?;
        Ok(rows.into_iter().filter_map(T::from_entity).collect())
    }

    /// Writes the staged changes and records them in the ledger.
    ///
    /// Dirty-flag propagation runs first and may append aggregate updates
    /// after the changes that caused them. A failure leaves the unit of work
    /// unusable; it can only be rolled back.
    pub async fn flush(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(Error::TransactionClosed);
        }
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut batch = std::mem::take(&mut self.pending);
        let session = self.session.as_deref_mut().ok_or(Error::TransactionClosed)?;
        if let Err(e) = write_batch(session, &mut batch).await {
            warn!("Flush failed, unit of work must roll back: {}", e);
            self.poisoned = true;
            return Err(e);
        }

        debug!("Flushed {} change(s)", batch.len());
        self.ledger.record_all(batch.into_iter().map(LedgerEntry::from));
        Ok(())
    }

    /// Flushes, commits the session, then publishes the ledger.
    ///
    /// The session commit and the publication run together on their own
    /// task, which is awaited here. Cancelling the caller at any point after
    /// the flush therefore cannot separate a committed transaction from its
    /// events. Publication failures are reported in the receipt; they never
    /// turn a committed transaction into an error.
    pub async fn commit(mut self) -> Result<CommitReceipt> {
        if let Err(e) = self.flush().await {
            self.abandon().await;
            return Err(e);
        }

        let session = self.session.take().ok_or(Error::TransactionClosed)?;
        let entries = self.ledger.drain_all();
        let observer = self.observer.clone();
        tokio::spawn(commit_and_publish(session, entries, observer))
            .await
            .unwrap_or_else(|e| {
                error!("Commit task failed: {}", e);
                Err(Error::Unexpected(format!("commit task failed: {}", e)))
            })
    }

    /// Rolls the session back. Nothing is published.
    pub async fn rollback(mut self) -> Result<()> {
        let mut session = self.session.take().ok_or(Error::TransactionClosed)?;
        let discarded = self.discard_changes();
        let result = session.rollback().await;
        self.observer.on_rollback(discarded);
        result
    }

    async fn abandon(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.rollback().await {
                warn!("Rollback after failed flush also failed: {}", e);
            }
        }
        let discarded = self.discard_changes();
        self.observer.on_rollback(discarded);
    }

    fn discard_changes(&mut self) -> usize {
        self.pending.clear();
        self.ledger.discard()
    }

    fn session_mut(&mut self) -> Result<&mut (dyn StoreSession + 'static)> {
        if self.poisoned {
            return Err(Error::TransactionClosed);
        }
        self.session.as_deref_mut().ok_or(Error::TransactionClosed)
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            let discarded = self.discard_changes();
            self.observer.on_rollback(discarded);
        }
    }
}

async fn commit_and_publish(
    mut session: Box<dyn StoreSession>,
    entries: Vec<LedgerEntry>,
    observer: Arc<dyn TransactionObserver>,
) -> Result<CommitReceipt> {
    if let Err(e) = session.commit().await {
        observer.on_rollback(entries.len());
        return Err(e);
    }
    // Release the connection before handlers open their own transactions.
    drop(session);

    let events = entries.len();
    if events == 0 {
        return Ok(CommitReceipt::default());
    }
    let report = observer.on_commit(entries).await;
    Ok(CommitReceipt { events, report })
}

async fn write_batch(session: &mut dyn StoreSession, batch: &mut Vec<PendingChange>) -> Result<()> {
    propagate_dirty_flags(session, batch).await?;
    for change in batch.iter() {
        session.apply(change).await?;
    }
    Ok(())
}
