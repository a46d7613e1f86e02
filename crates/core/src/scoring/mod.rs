//! Score bookkeeping: dirty-flag propagation at flush time, and the handlers
//! and recalculator that react to dirty aggregates after commit.

mod dirty_flags;
mod score_recalculator;
mod scoring_handlers;
mod scoring_traits;

pub use dirty_flags::{plan_dirty_targets, propagate_dirty_flags, DirtyTargets, SCORE_RELEVANT_FIELDS};
pub use score_recalculator::{ScoreRecalculator, ScoreTotals};
pub use scoring_handlers::{recompute_target, register_scoring_handlers, ScoringHandler, SCORING_SHAPES};
pub use scoring_traits::{MockScoringService, ScoreTarget, ScoringServiceTrait};
