//! Domain events module.
//!
//! Provides the domain event types built from committed ledger entries, the
//! in-process notification bus, and the commit-gated publisher that connects
//! the two. Handlers (scoring, broadcast) subscribe to the bus by event shape.

mod bus;
mod domain_event;
mod publisher;
mod sink;

pub use bus::*;
pub use domain_event::*;
pub use publisher::*;
pub use sink::*;
