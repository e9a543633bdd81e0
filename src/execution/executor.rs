//! Step executor - drives one step through request and payment handling

use crate::core::StepDefinition;
use crate::transport::{
    InvoiceDescriptor, PaymentAuth, ResponseStatus, ServiceResponse, ServiceTransport,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// How payment challenges are settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    /// Resubmit once with the one-shot bypass credential
    Mock,
    /// Fetch the invoice and abort the run for out-of-band settlement
    Live,
}

/// Terminal result of attempting one step over the network
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Succeeded {
        output: Value,
        latency_ms: u64,
        /// Whether success came on the resubmission after a 402
        settled_challenge: bool,
    },
    Failed {
        output: Value,
        latency_ms: u64,
        settled_challenge: bool,
    },
    /// Live-mode payment challenge; the whole run stops here
    PaymentDue {
        invoice: Option<InvoiceDescriptor>,
        latency_ms: u64,
    },
}

/// Executes a single step against the transport
pub struct StepExecutor<T> {
    transport: T,
    mode: PaymentMode,
}

impl<T: ServiceTransport> StepExecutor<T> {
    pub fn new(transport: T, mode: PaymentMode) -> Self {
        Self { transport, mode }
    }

    pub fn mode(&self) -> PaymentMode {
        self.mode
    }

    /// Submit the step's payload and resolve it to a terminal attempt
    /// outcome, handling at most one payment challenge.
    pub async fn execute(&self, step: &StepDefinition, payload: &Value) -> AttemptOutcome {
        info!("Submitting step: {}", step.id);
        debug!("Payload for step {}: {}", step.id, payload);

        let response = self
            .transport
            .invoke(&step.id, payload, PaymentAuth::None)
            .await;

        match response.status {
            ResponseStatus::PaymentRequired => self.settle_challenge(step, payload, response).await,
            _ => Self::resolve(&step.id, response, false),
        }
    }

    /// Handle a 402 according to the payment mode. Mock mode resubmits
    /// exactly once with the bypass credential scoped to that single call;
    /// a second challenge on the retry is a plain failure, never a loop.
    async fn settle_challenge(
        &self,
        step: &StepDefinition,
        payload: &Value,
        challenge: ServiceResponse,
    ) -> AttemptOutcome {
        match self.mode {
            PaymentMode::Mock => {
                info!("Step {} challenged with 402, resubmitting with test cert", step.id);
                let retry = self
                    .transport
                    .invoke(&step.id, payload, PaymentAuth::TestCert)
                    .await;

                if retry.status == ResponseStatus::PaymentRequired {
                    warn!("Step {} challenged again on the bypass retry", step.id);
                    return AttemptOutcome::Failed {
                        output: json!({ "error": "payment_required" }),
                        latency_ms: retry.latency_ms,
                        settled_challenge: true,
                    };
                }

                Self::resolve(&step.id, retry, true)
            }
            PaymentMode::Live => {
                warn!("Step {} requires live payment, fetching invoice", step.id);
                let invoice = match self.transport.fetch_invoice(&step.id).await {
                    Ok(invoice) => Some(invoice),
                    Err(e) => {
                        warn!("Invoice fetch for {} failed: {}", step.id, e);
                        None
                    }
                };
                AttemptOutcome::PaymentDue {
                    invoice,
                    latency_ms: challenge.latency_ms,
                }
            }
        }
    }

    /// Map a non-402 response to Succeeded or Failed
    fn resolve(step_id: &str, response: ServiceResponse, settled_challenge: bool) -> AttemptOutcome {
        match response.status {
            ResponseStatus::Success => AttemptOutcome::Succeeded {
                output: response.body,
                latency_ms: response.latency_ms,
                settled_challenge,
            },
            ResponseStatus::Error(code) => {
                warn!("Step {} failed with HTTP {}", step_id, code);
                AttemptOutcome::Failed {
                    output: Self::failure_body(response.body, code),
                    latency_ms: response.latency_ms,
                    settled_challenge,
                }
            }
            ResponseStatus::TransportFailed => {
                warn!("Step {} failed at the transport level", step_id);
                AttemptOutcome::Failed {
                    output: response.body,
                    latency_ms: response.latency_ms,
                    settled_challenge,
                }
            }
            // settle_challenge owns this branch
            ResponseStatus::PaymentRequired => AttemptOutcome::Failed {
                output: json!({ "error": "payment_required" }),
                latency_ms: response.latency_ms,
                settled_challenge,
            },
        }
    }

    /// Ensure a Failed outcome always carries a usable error payload
    fn failure_body(body: Value, code: u16) -> Value {
        let has_detail = body
            .as_object()
            .map(|obj| !obj.is_empty())
            .unwrap_or(false);
        if has_detail {
            body
        } else {
            json!({ "error": format!("HTTP {}", code) })
        }
    }
}
