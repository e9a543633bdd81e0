//! Test utilities: a scripted transport for deterministic engine tests

use async_trait::async_trait;
use satpipe::transport::{
    CapabilityMatches, DiscoverySnapshot, InvoiceDescriptor, PaymentAuth, ResponseStatus,
    ServiceRecord, ServiceResponse, ServiceTransport, TransportError,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One recorded invocation: capability id, payload, credential
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub capability_id: String,
    pub payload: Value,
    pub auth: PaymentAuth,
}

/// Transport that serves scripted responses and records every call.
///
/// Clones share state, so a copy handed to the engine can be inspected
/// after the run.
#[derive(Clone, Default)]
pub struct MockTransport {
    services: Arc<Mutex<Vec<ServiceRecord>>>,
    responses: Arc<Mutex<HashMap<String, VecDeque<ServiceResponse>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    invoice: Arc<Mutex<Option<InvoiceDescriptor>>>,
    fail_discovery: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service in the discovery snapshot
    pub fn with_service(self, id: &str, category: &str, units: u64) -> Self {
        let record: ServiceRecord = serde_json::from_value(json!({
            "id": id,
            "category": category,
            "pricing": { "units": units },
        }))
        .unwrap();
        self.services.lock().unwrap().push(record);
        self
    }

    /// Queue the next response for a capability; responses are consumed
    /// in order, one per invocation.
    pub fn script(self, id: &str, response: ServiceResponse) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_invoice(self, invoice: InvoiceDescriptor) -> Self {
        *self.invoice.lock().unwrap() = Some(invoice);
        self
    }

    pub fn failing_discovery(self) -> Self {
        *self.fail_discovery.lock().unwrap() = true;
        self
    }

    /// Every invocation made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations of one capability, in order
    pub fn calls_to(&self, id: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.capability_id == id)
            .collect()
    }
}

/// Successful response with the given body
pub fn ok(body: Value, latency_ms: u64) -> ServiceResponse {
    ServiceResponse {
        body,
        status: ResponseStatus::Success,
        latency_ms,
    }
}

/// Payment challenge response
pub fn payment_required(latency_ms: u64) -> ServiceResponse {
    ServiceResponse {
        body: json!({ "error": "payment required", "invoice": "lnbc..." }),
        status: ResponseStatus::PaymentRequired,
        latency_ms,
    }
}

/// Plain HTTP error response
pub fn http_error(code: u16, message: &str, latency_ms: u64) -> ServiceResponse {
    ServiceResponse {
        body: json!({ "error": message }),
        status: ResponseStatus::Error(code),
        latency_ms,
    }
}

#[async_trait]
impl ServiceTransport for MockTransport {
    async fn discover(&self) -> Result<DiscoverySnapshot, TransportError> {
        if *self.fail_discovery.lock().unwrap() {
            return Err(TransportError::Connection("scripted failure".to_string()));
        }
        let services = self.services.lock().unwrap().clone();
        let count = services.len();
        Ok(DiscoverySnapshot { services, count })
    }

    async fn query_capability(&self, capability: &str) -> Result<CapabilityMatches, TransportError> {
        let match_count = self
            .services
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.category == capability)
            .count() as u64;
        Ok(CapabilityMatches { match_count })
    }

    async fn invoke(
        &self,
        capability_id: &str,
        payload: &Value,
        auth: PaymentAuth,
    ) -> ServiceResponse {
        self.calls.lock().unwrap().push(RecordedCall {
            capability_id: capability_id.to_string(),
            payload: payload.clone(),
            auth,
        });

        self.responses
            .lock()
            .unwrap()
            .get_mut(capability_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| http_error(404, "no scripted response", 1))
    }

    async fn fetch_invoice(
        &self,
        capability_id: &str,
    ) -> Result<InvoiceDescriptor, TransportError> {
        self.invoice
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Status(404))
            .map(|mut invoice| {
                invoice.capability_id = capability_id.to_string();
                invoice
            })
    }
}
