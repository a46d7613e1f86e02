//! Change capture: staged mutations and the per-transaction ledger.

mod ledger;
mod pending;

pub use ledger::{ChangeLedger, LedgerEntry};
pub use pending::{ChangeOperation, PendingChange};
