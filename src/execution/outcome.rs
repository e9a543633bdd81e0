//! Step outcome models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal state of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeState {
    /// The service answered with a success status
    Succeeded,
    /// The service answered with a non-payment error, or the transport
    /// failed outright
    Failed,
    /// No service offers this capability; never attempted on the network
    Blocked,
}

/// Record of one step reaching a terminal state.
///
/// Produced exactly once per step per run and immutable afterwards; the
/// ordered collection of these is the outcome log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_id: String,

    pub state: OutcomeState,

    /// Response payload; present for Succeeded and Failed, absent for
    /// Blocked
    pub output: Option<Value>,

    /// Units charged for this step. Cost is incurred on attempt, so
    /// Failed steps carry their price too; Blocked steps are free.
    pub cost_charged: u64,

    /// Wall-clock latency of the final attempt
    pub latency_ms: u64,

    pub recorded_at: DateTime<Utc>,
}

impl StepOutcome {
    pub fn succeeded(step_id: &str, output: Value, cost_charged: u64, latency_ms: u64) -> Self {
        Self {
            step_id: step_id.to_string(),
            state: OutcomeState::Succeeded,
            output: Some(output),
            cost_charged,
            latency_ms,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(step_id: &str, output: Value, cost_charged: u64, latency_ms: u64) -> Self {
        Self {
            step_id: step_id.to_string(),
            state: OutcomeState::Failed,
            output: Some(output),
            cost_charged,
            latency_ms,
            recorded_at: Utc::now(),
        }
    }

    pub fn blocked(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            state: OutcomeState::Blocked,
            output: None,
            cost_charged: 0,
            latency_ms: 0,
            recorded_at: Utc::now(),
        }
    }

    /// Short error description for Failed outcomes
    pub fn error_text(&self) -> Option<String> {
        if self.state != OutcomeState::Failed {
            return None;
        }
        let text = self
            .output
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(|v| v.as_str())
            .unwrap_or("request failed")
            .to_string();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blocked_outcome_is_free_and_silent() {
        let outcome = StepOutcome::blocked("code-analyze");
        assert_eq!(outcome.state, OutcomeState::Blocked);
        assert_eq!(outcome.cost_charged, 0);
        assert_eq!(outcome.latency_ms, 0);
        assert!(outcome.output.is_none());
        assert!(outcome.error_text().is_none());
    }

    #[test]
    fn test_failed_outcome_exposes_error_text() {
        let outcome = StepOutcome::failed("btc-price", json!({ "error": "timeout" }), 5, 120);
        assert_eq!(outcome.error_text().as_deref(), Some("timeout"));

        let bare = StepOutcome::failed("btc-price", json!({ "raw": "oops" }), 5, 120);
        assert_eq!(bare.error_text().as_deref(), Some("request failed"));
    }
}
