//! Gap analysis for blocked steps
//!
//! When a step's capability has no provider, the run still wants a
//! structured picture of what the step needed: the payload it would have
//! sent, the contract it assumed, and a rough price band a provider
//! could charge. All of this is computed locally from the step
//! definition and prior outputs; no request is ever issued.

use crate::core::{OutputsMap, ServiceRegistry, StepDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Estimated price range for a missing capability, in payment units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub low_units: u64,
    pub high_units: u64,
}

impl PriceBand {
    /// Band around a reference price: low is 60% of it (at least one
    /// unit), high is double it.
    pub fn around(price_units: u64) -> Self {
        Self {
            low_units: (price_units * 3 / 5).max(1),
            high_units: (price_units * 2).max(2),
        }
    }
}

/// Diagnostic record for a step that could not run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    /// Capability id no provider offers
    pub capability_id: String,

    /// Capability category the step was looking for
    pub category: String,

    /// Providers the registry knows for the same category, if any
    pub related_providers: Vec<String>,

    /// Payload the step would have sent, built from real prior outputs
    pub attempted_payload: Value,

    /// Input fields a provider would need to accept
    pub wanted_input: Vec<String>,

    /// Output fields the rest of the pipeline expected back
    pub wanted_output: Vec<String>,

    pub price_band: PriceBand,
}

/// Build a gap report for a step absent from the registry.
///
/// The registry is read only for category neighbors; the report itself
/// comes from the step definition and the outputs accumulated so far.
pub fn analyze(
    step: &StepDefinition,
    outputs: &OutputsMap,
    registry: &ServiceRegistry,
) -> GapReport {
    let related_providers = registry
        .query_by_capability(&step.capability)
        .into_iter()
        .map(|s| s.capability_id.clone())
        .collect();

    GapReport {
        capability_id: step.id.clone(),
        category: step.capability.clone(),
        related_providers,
        attempted_payload: step.input.payload(outputs),
        wanted_input: step.expected_input.clone(),
        wanted_output: step.expected_output.clone(),
        price_band: PriceBand::around(step.fallback_price),
    }
}
