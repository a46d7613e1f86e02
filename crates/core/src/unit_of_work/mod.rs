//! Transaction scope, persistence seam and lifecycle hooks.

mod memory_store;
mod store_traits;
#[allow(clippy::module_inception)]
mod unit_of_work;

#[cfg(test)]
mod unit_of_work_tests;

pub use memory_store::InMemoryStore;
pub use store_traits::{Store, StoreSession, TransactionObserver};
pub use unit_of_work::{CommitReceipt, UnitOfWork, UnitOfWorkFactory};
