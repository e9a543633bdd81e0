//! Service descriptor registry
//!
//! Normalized view of the services discovered at run start. Built once
//! per run and read-only afterwards. A capability missing from here is a
//! normal state (the step gets Blocked), unlike a failed discovery fetch
//! which kills the run.

use crate::transport::{DiscoverySnapshot, ServiceRecord, ServiceTransport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// Normalized descriptor for one discovered service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unique id within the registry; also the invocation route
    pub capability_id: String,

    /// Capability category (price lookup, sentiment, ...)
    pub category: String,

    /// Declared price per call, in payment units
    pub price_units: u64,

    /// Declared input field names, possibly empty
    pub input_schema: Vec<String>,

    /// Declared output field names, possibly empty
    pub output_schema: Vec<String>,
}

/// Property names out of a JSON Schema fragment, sorted for stable
/// diagnostics. Anything that is not an object schema yields nothing.
fn schema_fields(schema: Option<&Value>) -> Vec<String> {
    let mut fields: Vec<String> = schema
        .and_then(|s| s.get("properties"))
        .and_then(|p| p.as_object())
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();
    fields.sort();
    fields
}

impl ServiceDescriptor {
    fn from_record(record: &ServiceRecord) -> Self {
        Self {
            capability_id: record.id.clone(),
            category: record.category.clone(),
            price_units: record.pricing.units,
            input_schema: schema_fields(record.input_schema.as_ref()),
            output_schema: schema_fields(record.output_schema.as_ref()),
        }
    }
}

/// All services known for the current run, keyed by capability id
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceDescriptor>,
}

impl ServiceRegistry {
    /// Normalize a discovery snapshot into a registry
    pub fn from_snapshot(snapshot: &DiscoverySnapshot) -> Self {
        let services = snapshot
            .services
            .iter()
            .map(|record| (record.id.clone(), ServiceDescriptor::from_record(record)))
            .collect();
        Self { services }
    }

    /// Run discovery and build the registry. An `Err` here is fatal to
    /// the whole run.
    pub async fn discover<T: ServiceTransport>(transport: &T) -> Result<Self, TransportError> {
        let snapshot = transport.discover().await?;
        info!("Discovered {} services", snapshot.services.len());
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn lookup(&self, capability_id: &str) -> Option<&ServiceDescriptor> {
        self.services.get(capability_id)
    }

    /// Services offering a capability category, sorted by id. Diagnostic
    /// use only; execution routes by capability id.
    pub fn query_by_capability(&self, category: &str) -> Vec<&ServiceDescriptor> {
        let mut matches: Vec<&ServiceDescriptor> = self
            .services
            .values()
            .filter(|s| s.category == category)
            .collect();
        matches.sort_by(|a, b| a.capability_id.cmp(&b.capability_id));
        matches
    }

    /// All known services, sorted by capability id
    pub fn services(&self) -> Vec<&ServiceDescriptor> {
        let mut all: Vec<&ServiceDescriptor> = self.services.values().collect();
        all.sort_by(|a, b| a.capability_id.cmp(&b.capability_id));
        all
    }

    /// Declared price for a capability id, if the registry knows one
    pub fn price_of(&self, capability_id: &str) -> Option<u64> {
        self.services.get(capability_id).map(|s| s.price_units)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_snapshot() -> DiscoverySnapshot {
        serde_json::from_value(json!({
            "services": [
                {
                    "id": "btc-price",
                    "category": "price_oracle",
                    "pricing": { "units": 5 },
                    "input_schema": { "properties": { "currency": {} } },
                    "output_schema": { "properties": { "price": {}, "change_24h": {}, "provider": {} } }
                },
                {
                    "id": "vibe-check",
                    "category": "sentiment",
                    "pricing": { "units": 10 },
                    "input_schema": { "properties": { "text": {} } }
                },
                {
                    "id": "ext-search-v2",
                    "category": "search",
                    "pricing": { "units": 10 }
                }
            ],
            "count": 3
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_and_price() {
        let registry = ServiceRegistry::from_snapshot(&sample_snapshot());
        assert_eq!(registry.len(), 3);

        let btc = registry.lookup("btc-price").unwrap();
        assert_eq!(btc.category, "price_oracle");
        assert_eq!(btc.price_units, 5);
        assert_eq!(registry.price_of("vibe-check"), Some(10));

        assert!(registry.lookup("code-analyze").is_none());
        assert_eq!(registry.price_of("code-analyze"), None);
    }

    #[test]
    fn test_schema_fields_are_sorted_names() {
        let registry = ServiceRegistry::from_snapshot(&sample_snapshot());
        let btc = registry.lookup("btc-price").unwrap();
        assert_eq!(btc.output_schema, vec!["change_24h", "price", "provider"]);

        // No declared schema normalizes to no fields
        let search = registry.lookup("ext-search-v2").unwrap();
        assert!(search.input_schema.is_empty());
        assert!(search.output_schema.is_empty());
    }

    #[test]
    fn test_query_by_capability_is_sorted_and_diagnostic() {
        let registry = ServiceRegistry::from_snapshot(&sample_snapshot());
        let matches = registry.query_by_capability("sentiment");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].capability_id, "vibe-check");

        assert!(registry.query_by_capability("translation").is_empty());
    }
}
