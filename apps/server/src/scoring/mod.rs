//! Score recompute runtime for the web server.
//!
//! Scoring handlers enqueue recompute requests without blocking the commit
//! path. A background worker debounces them, collapses duplicates and runs
//! one recompute unit of work per aggregate.

mod planner;
mod queue_worker;
mod service;

pub use planner::plan_recompute;
pub use service::QueuedScoringService;
