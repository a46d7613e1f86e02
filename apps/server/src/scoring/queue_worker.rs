//! Recompute queue worker.
//!
//! Receives requests from an mpsc channel, waits until no new request has
//! arrived for the debounce window, then recomputes each distinct aggregate.

use std::time::Duration;

use rangeops_core::scoring::{ScoreRecalculator, ScoreTarget};
use tokio::sync::mpsc;

use super::planner::plan_recompute;

/// Runs until the channel closes, flushing the last batch on the way out.
pub async fn score_queue_worker(
    mut rx: mpsc::UnboundedReceiver<ScoreTarget>,
    recalculator: ScoreRecalculator,
    debounce: Duration,
) {
    tracing::info!("Score recompute worker started");
    let mut pending: Vec<ScoreTarget> = Vec::new();

    loop {
        if pending.is_empty() {
            match rx.recv().await {
                Some(target) => pending.push(target),
                None => break,
            }
            continue;
        }

        tokio::select! {
            request = rx.recv() => match request {
                Some(target) => pending.push(target),
                None => {
                    process_batch(&recalculator, std::mem::take(&mut pending)).await;
                    break;
                }
            },
            _ = tokio::time::sleep(debounce) => {
                process_batch(&recalculator, std::mem::take(&mut pending)).await;
            }
        }
    }
    tracing::info!("Score recompute worker shutting down");
}

async fn process_batch(recalculator: &ScoreRecalculator, batch: Vec<ScoreTarget>) {
    let targets = plan_recompute(&batch);
    tracing::info!(
        "Recomputing {} aggregate(s) from {} request(s)",
        targets.len(),
        batch.len()
    );

    for target in targets {
        match recalculator.recalculate(target).await {
            Ok(true) => tracing::debug!("Recomputed {}", target),
            Ok(false) => tracing::debug!("{} no longer exists", target),
            Err(e) => tracing::warn!("Score recompute for {} failed: {}", target, e),
        }
    }
}
