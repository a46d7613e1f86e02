use std::sync::Arc;

use async_trait::async_trait;
use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use rangeops_core::changes::PendingChange;
use rangeops_core::entities::{Entity, EntityKey, EntityKind, Owner};
use rangeops_core::errors::Error;
use rangeops_core::unit_of_work::{Store, StoreSession};
use rangeops_core::Result;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::rows::{find_row, list_owned_rows, write_change};
use crate::db::{self, DbConnection, DbPool};
use crate::errors::{IntoCore, StorageError};

/// SQLite persistence engine.
///
/// Sessions hold a `BEGIN IMMEDIATE` transaction on a pooled connection. Only
/// one session is open at a time: the writer permit is taken in
/// [`Store::begin`] and released when the session commits, rolls back or is
/// dropped.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<DbPool>,
    writer: Arc<Semaphore>,
}

impl SqliteStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            pool,
            writer: Arc::new(Semaphore::new(1)),
        }
    }

    /// Initialises the database file, builds the pool and applies pending
    /// migrations.
    pub fn open(db_path: &str, pool_size: u32) -> Result<Self> {
        db::init(db_path)?;
        let pool = db::create_pool(db_path, pool_size)?;
        db::run_migrations(&pool)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreSession>> {
        let permit = self
            .writer
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Unexpected(format!("writer permit closed: {}", e)))?;

        let pool = self.pool.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<DbConnection> {
            let mut conn = db::get_connection(&pool)?;
            AnsiTransactionManager::begin_transaction_sql(&mut *conn, "BEGIN IMMEDIATE")
                .into_core()?;
            Ok(conn)
        })
        .await
        .map_err(StorageError::from)??;

        Ok(Box::new(SqliteSession {
            conn: Some(conn),
            permit: Some(permit),
        }))
    }
}

/// One open SQLite transaction.
///
/// Diesel is synchronous, so every call moves the connection onto the
/// blocking pool and takes it back when the work finishes.
pub struct SqliteSession {
    conn: Option<DbConnection>,
    permit: Option<OwnedSemaphorePermit>,
}

impl SqliteSession {
    async fn run<T, F>(&mut self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let mut conn = self.conn.take().ok_or(Error::TransactionClosed)?;
        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut conn);
            (conn, result)
        })
        .await
        .map_err(StorageError::from)?;
        self.conn = Some(conn);
        result
    }

    /// Ends the transaction and hands the connection back to the pool.
    async fn finish(&mut self, commit: bool) -> Result<()> {
        let mut conn = self.conn.take().ok_or(Error::TransactionClosed)?;
        let outcome = tokio::task::spawn_blocking(move || {
            if commit {
                AnsiTransactionManager::commit_transaction(&mut *conn)
            } else {
                AnsiTransactionManager::rollback_transaction(&mut *conn)
            }
        })
        .await
        .map_err(StorageError::from)?;
        self.permit = None;
        outcome.into_core()
    }
}

#[async_trait]
impl StoreSession for SqliteSession {
    async fn find(&mut self, key: EntityKey) -> Result<Option<Entity>> {
        self.run(move |conn| find_row(conn, key)).await
    }

    async fn list_owned(&mut self, kind: EntityKind, owner: Owner) -> Result<Vec<Entity>> {
        self.run(move |conn| list_owned_rows(conn, kind, owner)).await
    }

    async fn apply(&mut self, change: &PendingChange) -> Result<()> {
        let change = change.clone();
        self.run(move |conn| write_change(conn, &change)).await
    }

    async fn commit(&mut self) -> Result<()> {
        self.finish(true).await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.finish(false).await
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        let permit = self.permit.take();
        debug!("Rolling back abandoned SQLite session");
        let rollback = move || {
            if let Err(e) = AnsiTransactionManager::rollback_transaction(&mut *conn) {
                warn!("Rollback of abandoned session failed: {}", e);
            }
            drop(permit);
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(rollback);
            }
            Err(_) => rollback(),
        }
    }
}
