//! HTTP transport implementation over reqwest

use super::{
    CapabilityMatches, DiscoverySnapshot, InvoiceDescriptor, PaymentAuth, ResponseStatus,
    ServiceResponse, ServiceTransport, TransportConfig, TransportError,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};

/// Header carrying the one-shot certification-test bypass credential
const CERT_TEST_HEADER: &str = "X-D3P-Cert-Test";

/// Cap on raw (non-JSON) response bodies kept for error reporting
const RAW_BODY_CAP: usize = 500;

/// Production transport speaking HTTP/JSON to d3p endpoints
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn classify(&self, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.config.timeout)
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Decode(err.to_string())
        }
    }

    /// Decode a response body as JSON, falling back to a capped raw echo
    async fn body_of(resp: reqwest::Response) -> Value {
        match resp.text().await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) => {
                    let raw: String = text.chars().take(RAW_BODY_CAP).collect();
                    json!({ "raw": raw })
                }
            },
            Err(e) => json!({ "error": e.to_string() }),
        }
    }
}

#[async_trait]
impl ServiceTransport for HttpTransport {
    async fn discover(&self) -> Result<DiscoverySnapshot, TransportError> {
        let url = format!("{}/manifest", self.config.base_url);
        debug!("Fetching discovery snapshot from {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(TransportError::Status(status));
        }

        resp.json::<DiscoverySnapshot>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn query_capability(&self, capability: &str) -> Result<CapabilityMatches, TransportError> {
        let url = format!("{}/query", self.config.discovery_url);
        debug!("Querying discovery network for capability '{}'", capability);

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "capability": capability }))
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(TransportError::Status(status));
        }

        resp.json::<CapabilityMatches>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn invoke(
        &self,
        capability_id: &str,
        payload: &Value,
        auth: PaymentAuth,
    ) -> ServiceResponse {
        let url = format!("{}/{}", self.config.base_url, capability_id);
        debug!("POST {} (auth: {:?})", url, auth);

        let mut request = self.client.post(&url).json(payload);
        if auth == PaymentAuth::TestCert {
            request = request.header(CERT_TEST_HEADER, "true");
        }

        let start = Instant::now();
        let result = request.send().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(resp) => {
                let status = ResponseStatus::from_code(resp.status().as_u16());
                let body = Self::body_of(resp).await;
                ServiceResponse {
                    body,
                    status,
                    latency_ms,
                }
            }
            Err(e) if e.is_timeout() => {
                warn!("Invocation of '{}' timed out", capability_id);
                ServiceResponse::transport_failed("timeout", latency_ms)
            }
            Err(e) => {
                warn!("Invocation of '{}' failed: {}", capability_id, e);
                ServiceResponse::transport_failed("connection_failed", latency_ms)
            }
        }
    }

    async fn fetch_invoice(&self, capability_id: &str) -> Result<InvoiceDescriptor, TransportError> {
        let url = format!("{}/l402/invoice", self.config.base_url);
        debug!("Fetching invoice for '{}'", capability_id);

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "capability_id": capability_id }))
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(TransportError::Status(status));
        }

        resp.json::<InvoiceDescriptor>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
