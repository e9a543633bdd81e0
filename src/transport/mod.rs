//! Transport to d3p services
//!
//! The engine never talks HTTP directly; it goes through the
//! [`ServiceTransport`] trait so tests can script responses and the
//! production [`HttpTransport`] stays swappable.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub use http::HttpTransport;

/// Error types for transport operations that are allowed to fail hard
/// (discovery, capability queries, invoice fetches). Step invocations
/// never return these; see [`ServiceResponse`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Payment credential attached to a single step invocation.
///
/// Passed per request, never stored on a shared client, so a bypass
/// credential used for one retry cannot leak into later calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentAuth {
    /// No credential; the normal first submission.
    #[default]
    None,
    /// One-shot certification-test bypass, valid for exactly this call.
    TestCert,
}

/// Status of a step invocation, as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// 2xx
    Success,
    /// 402 — the service wants settlement before honoring the request
    PaymentRequired,
    /// Any other HTTP status
    Error(u16),
    /// The request never produced an HTTP response (refused, timed out)
    TransportFailed,
}

impl ResponseStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=299 => ResponseStatus::Success,
            402 => ResponseStatus::PaymentRequired,
            other => ResponseStatus::Error(other),
        }
    }
}

/// What a step invocation produced.
///
/// Transport-level failures are folded into a `{"error": reason}` body
/// with [`ResponseStatus::TransportFailed`] rather than surfaced as an
/// `Err` — the engine treats them as a failed step, not a crashed run.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    /// Response body, or a synthesized error document
    pub body: Value,

    /// Outcome classification of the call
    pub status: ResponseStatus,

    /// Wall-clock latency around the call, whatever the outcome
    pub latency_ms: u64,
}

impl ServiceResponse {
    /// Synthesize a response for a call that never reached the service
    pub fn transport_failed(reason: &str, latency_ms: u64) -> Self {
        Self {
            body: json!({ "error": reason }),
            status: ResponseStatus::TransportFailed,
            latency_ms,
        }
    }
}

/// One service entry in the discovery snapshot (wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub pricing: Pricing,

    /// JSON Schema fragment; only the property names matter to us
    #[serde(default)]
    pub input_schema: Option<Value>,

    #[serde(default)]
    pub output_schema: Option<Value>,
}

/// Declared price of a service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default)]
    pub units: u64,
}

/// Registry snapshot returned by the discovery fetch (wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySnapshot {
    #[serde(default)]
    pub services: Vec<ServiceRecord>,

    #[serde(default)]
    pub count: usize,
}

/// Result of a capability query, used for diagnostics only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityMatches {
    #[serde(default)]
    pub match_count: u64,
}

/// Payment descriptor fetched from the invoice endpoint in live mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDescriptor {
    #[serde(default)]
    pub capability_id: String,

    /// Settlement instructions (e.g. a Lightning invoice string)
    #[serde(default)]
    pub invoice: String,

    #[serde(default)]
    pub amount_units: u64,
}

/// Trait for talking to the d3p network - allows for different implementations
#[async_trait]
pub trait ServiceTransport: Send + Sync {
    /// Fetch the service registry snapshot. A failure here is fatal to the
    /// whole run, unlike a missing capability which is a normal outcome.
    async fn discover(&self) -> Result<DiscoverySnapshot, TransportError>;

    /// Ask the discovery network how many services offer a capability
    async fn query_capability(&self, capability: &str) -> Result<CapabilityMatches, TransportError>;

    /// Invoke a service with a payload. Infallible by contract: transport
    /// failures come back as a `TransportFailed` response.
    async fn invoke(&self, capability_id: &str, payload: &Value, auth: PaymentAuth)
        -> ServiceResponse;

    /// Fetch the payment descriptor for a capability (live mode only)
    async fn fetch_invoice(&self, capability_id: &str)
        -> Result<InvoiceDescriptor, TransportError>;
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL for service invocations
    pub base_url: String,

    /// Base URL for the discovery network
    pub discovery_url: String,

    /// Per-call timeout
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://labs.digital3.ai/api/services".to_string(),
            discovery_url: "https://labs.digital3.ai/api/discover".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_discovery_url(mut self, discovery_url: String) -> Self {
        self.discovery_url = discovery_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ResponseStatus::from_code(200), ResponseStatus::Success);
        assert_eq!(ResponseStatus::from_code(201), ResponseStatus::Success);
        assert_eq!(ResponseStatus::from_code(402), ResponseStatus::PaymentRequired);
        assert_eq!(ResponseStatus::from_code(404), ResponseStatus::Error(404));
        assert_eq!(ResponseStatus::from_code(500), ResponseStatus::Error(500));
    }

    #[test]
    fn test_transport_failed_body() {
        let resp = ServiceResponse::transport_failed("connection_failed", 0);
        assert_eq!(resp.status, ResponseStatus::TransportFailed);
        assert_eq!(resp.body["error"], "connection_failed");
    }

    #[test]
    fn test_transport_config_builder() {
        let config = TransportConfig::new()
            .with_base_url("http://localhost:8080/services".to_string())
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://localhost:8080/services");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.discovery_url.contains("discover"));
    }

    #[test]
    fn test_snapshot_parses_with_missing_fields() {
        let snapshot: DiscoverySnapshot = serde_json::from_value(serde_json::json!({
            "services": [
                { "id": "btc-price" },
                {
                    "id": "vibe-check",
                    "category": "sentiment",
                    "pricing": { "units": 10 },
                    "input_schema": { "properties": { "text": {} } }
                }
            ],
            "count": 2
        }))
        .unwrap();

        assert_eq!(snapshot.services.len(), 2);
        assert_eq!(snapshot.services[0].pricing.units, 0);
        assert_eq!(snapshot.services[1].pricing.units, 10);
    }
}
