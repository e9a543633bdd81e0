//! Cost and latency aggregation over the outcome log

use crate::execution::{OutcomeState, StepOutcome};
use serde::Serialize;

/// One row of the per-step summary, in pipeline order
#[derive(Debug, Clone, Serialize)]
pub struct StepStat {
    pub step_id: String,
    pub state: OutcomeState,
    pub cost_units: u64,
    pub latency_ms: u64,
}

/// Totals plus the per-step breakdown for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub total_cost: u64,
    pub total_latency_ms: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub blocked: usize,
    pub per_step: Vec<StepStat>,
}

/// Fold the outcome log into totals. The totals are exactly the sums of
/// the per-step rows; nothing is charged outside the log.
pub fn summarize(outcomes: &[StepOutcome]) -> RunStats {
    let per_step: Vec<StepStat> = outcomes
        .iter()
        .map(|o| StepStat {
            step_id: o.step_id.clone(),
            state: o.state,
            cost_units: o.cost_charged,
            latency_ms: o.latency_ms,
        })
        .collect();

    let count = |state: OutcomeState| outcomes.iter().filter(|o| o.state == state).count();

    RunStats {
        total_cost: per_step.iter().map(|s| s.cost_units).sum(),
        total_latency_ms: per_step.iter().map(|s| s.latency_ms).sum(),
        succeeded: count(OutcomeState::Succeeded),
        failed: count(OutcomeState::Failed),
        blocked: count(OutcomeState::Blocked),
        per_step,
    }
}
