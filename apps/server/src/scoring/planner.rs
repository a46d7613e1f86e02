//! Batch planning for score recompute requests.

use std::collections::BTreeSet;

use rangeops_core::scoring::ScoreTarget;

/// Collapses a batch of requests into the distinct aggregates to recompute.
///
/// Scenarios come first, then templates, each in id order.
pub fn plan_recompute(requests: &[ScoreTarget]) -> Vec<ScoreTarget> {
    requests
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_duplicates_collapse() {
        let scenario = Uuid::new_v4();
        let template = Uuid::new_v4();
        let planned = plan_recompute(&[
            ScoreTarget::ScenarioTemplate(template),
            ScoreTarget::Scenario(scenario),
            ScoreTarget::Scenario(scenario),
            ScoreTarget::ScenarioTemplate(template),
        ]);
        assert_eq!(
            planned,
            vec![
                ScoreTarget::Scenario(scenario),
                ScoreTarget::ScenarioTemplate(template)
            ]
        );
    }

    #[test]
    fn test_same_id_different_kind_stays_distinct() {
        let id = Uuid::new_v4();
        let planned = plan_recompute(&[ScoreTarget::Scenario(id), ScoreTarget::ScenarioTemplate(id)]);
        assert_eq!(planned.len(), 2);
    }

    #[test]
    fn test_empty_batch_plans_nothing() {
        assert!(plan_recompute(&[]).is_empty());
    }
}
