//! Main execution engine - orchestrates the entire pipeline run
//!
//! Strictly sequential: a step never starts before the previous one is
//! terminal. A Failed step charges and continues; a Blocked step costs
//! nothing and triggers gap analysis; an unresolved live-mode payment
//! challenge aborts the whole run.

use crate::analysis::{self, GapReport};
use crate::core::{OutputsMap, Pipeline, ServiceRegistry, StepDefinition};
use crate::execution::{
    executor::{AttemptOutcome, PaymentMode, StepExecutor},
    outcome::StepOutcome,
};
use crate::transport::{InvoiceDescriptor, ServiceTransport};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Run-terminating engine errors. Per-step failures never appear here;
/// they are absorbed into the outcome log.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("payment required for step '{step_id}'; settle the invoice and re-run")]
    PaymentRequired {
        step_id: String,
        invoice: Option<InvoiceDescriptor>,
    },
}

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        step_id: String,
        display_name: String,
        index: usize,
        total: usize,
        price_units: u64,
    },
    StepSucceeded {
        step_id: String,
        cost_units: u64,
        latency_ms: u64,
    },
    StepFailed {
        step_id: String,
        error: String,
        latency_ms: u64,
    },
    StepBlocked {
        step_id: String,
        capability: String,
    },
    /// A 402 challenge was settled in mock mode (one bypass resubmission)
    PaymentChallengeSettled {
        step_id: String,
    },
    PipelineAborted {
        run_id: Uuid,
        step_id: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        total_cost: u64,
        total_latency_ms: u64,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Everything a completed (non-aborted) run produced
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub pipeline_name: String,

    /// One outcome per step, in pipeline order
    pub outcomes: Vec<StepOutcome>,

    /// Succeeded/Failed payloads keyed by step id
    pub outputs: OutputsMap,

    /// One gap report per Blocked step, in pipeline order
    pub gaps: Vec<GapReport>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Main pipeline execution engine
pub struct ExecutionEngine<T> {
    executor: StepExecutor<T>,
    registry: ServiceRegistry,
    event_handlers: Vec<EventHandler>,
}

impl<T: ServiceTransport> ExecutionEngine<T> {
    pub fn new(transport: T, registry: ServiceRegistry, mode: PaymentMode) -> Self {
        Self {
            executor: StepExecutor::new(transport, mode),
            registry,
            event_handlers: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Add an event handler. Handlers run synchronously on the execution
    /// thread, in registration order.
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Declared price from the registry, or the step's fallback
    fn price_of(&self, step: &StepDefinition) -> u64 {
        self.registry
            .price_of(&step.id)
            .unwrap_or(step.fallback_price)
    }

    /// Execute the entire pipeline
    pub async fn run(&self, pipeline: &Pipeline) -> Result<PipelineRun, EngineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = pipeline.steps.len();

        info!("Starting pipeline run: {} ({})", pipeline.name, run_id);
        self.emit(ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: total,
        });

        let mut outputs = OutputsMap::new();
        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(total);
        let mut gaps: Vec<GapReport> = Vec::new();

        for (index, step) in pipeline.steps.iter().enumerate() {
            // Availability is checked before any payload is built.
            if self.registry.lookup(&step.id).is_none() {
                warn!("No service for capability '{}', step {} blocked", step.capability, step.id);
                let gap = analysis::analyze(step, &outputs, &self.registry);
                self.emit(ExecutionEvent::StepBlocked {
                    step_id: step.id.clone(),
                    capability: step.capability.clone(),
                });
                outcomes.push(StepOutcome::blocked(&step.id));
                gaps.push(gap);
                continue;
            }

            let price = self.price_of(step);
            let payload = step.input.payload(&outputs);

            self.emit(ExecutionEvent::StepStarted {
                step_id: step.id.clone(),
                display_name: step.display_name.clone(),
                index: index + 1,
                total,
                price_units: price,
            });

            match self.executor.execute(step, &payload).await {
                AttemptOutcome::Succeeded {
                    output,
                    latency_ms,
                    settled_challenge,
                } => {
                    if settled_challenge {
                        self.emit(ExecutionEvent::PaymentChallengeSettled {
                            step_id: step.id.clone(),
                        });
                    }
                    outputs.insert(&step.id, output.clone());
                    outcomes.push(StepOutcome::succeeded(&step.id, output, price, latency_ms));
                    self.emit(ExecutionEvent::StepSucceeded {
                        step_id: step.id.clone(),
                        cost_units: price,
                        latency_ms,
                    });
                }
                AttemptOutcome::Failed {
                    output,
                    latency_ms,
                    settled_challenge,
                } => {
                    if settled_challenge {
                        self.emit(ExecutionEvent::PaymentChallengeSettled {
                            step_id: step.id.clone(),
                        });
                    }
                    // Failed payloads still land in the outputs map so
                    // later composers can degrade instead of guessing.
                    outputs.insert(&step.id, output.clone());
                    let outcome = StepOutcome::failed(&step.id, output, price, latency_ms);
                    self.emit(ExecutionEvent::StepFailed {
                        step_id: step.id.clone(),
                        error: outcome.error_text().unwrap_or_default(),
                        latency_ms,
                    });
                    outcomes.push(outcome);
                }
                AttemptOutcome::PaymentDue { invoice, .. } => {
                    self.emit(ExecutionEvent::PipelineAborted {
                        run_id,
                        step_id: step.id.clone(),
                    });
                    return Err(EngineError::PaymentRequired {
                        step_id: step.id.clone(),
                        invoice,
                    });
                }
            }
        }

        let total_cost: u64 = outcomes.iter().map(|o| o.cost_charged).sum();
        let total_latency_ms: u64 = outcomes.iter().map(|o| o.latency_ms).sum();

        info!(
            "Pipeline run finished: {} ({} steps, {} units, {}ms)",
            pipeline.name, total, total_cost, total_latency_ms
        );
        self.emit(ExecutionEvent::PipelineCompleted {
            run_id,
            total_cost,
            total_latency_ms,
        });

        Ok(PipelineRun {
            run_id,
            pipeline_name: pipeline.name.clone(),
            outcomes,
            outputs,
            gaps,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
