//! Schema compatibility checker
//!
//! Advisory comparison of adjacent steps' declared schemas. The result is
//! reported during the discovery phase and never gates execution.

use crate::core::registry::ServiceRegistry;
use crate::core::step::StepDefinition;

/// How many shared fields to surface in diagnostics
const DISPLAY_FIELD_CAP: usize = 4;

/// Outcome of comparing one step's output schema to the next step's input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCompat {
    /// The target declares an input schema; listed fields also appear in
    /// the source's output schema (capped for display)
    Compatible { shared: Vec<String> },
    /// Neither schema tells us anything; a hand-written composer governs
    /// input construction
    CustomMapping,
}

/// Compare `source`'s declared output fields against `target`'s declared
/// input fields. Declared schemas come from the registry; a step absent
/// from the registry contributes its assumed fields.
pub fn check(
    source: &StepDefinition,
    target: &StepDefinition,
    registry: &ServiceRegistry,
) -> SchemaCompat {
    let source_out = registry
        .lookup(&source.id)
        .map(|d| d.output_schema.clone())
        .unwrap_or_else(|| source.expected_output.clone());
    let target_in = registry
        .lookup(&target.id)
        .map(|d| d.input_schema.clone())
        .unwrap_or_else(|| target.expected_input.clone());

    if target_in.is_empty() {
        return SchemaCompat::CustomMapping;
    }

    let mut shared: Vec<String> = source_out
        .iter()
        .filter(|f| target_in.contains(f))
        .cloned()
        .collect();
    shared.truncate(DISPLAY_FIELD_CAP);

    SchemaCompat::Compatible { shared }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::step::Pipeline;
    use crate::transport::DiscoverySnapshot;
    use serde_json::json;

    fn registry() -> ServiceRegistry {
        let snapshot: DiscoverySnapshot = serde_json::from_value(json!({
            "services": [
                {
                    "id": "btc-price",
                    "category": "price_oracle",
                    "output_schema": { "properties": { "price": {}, "change_24h": {} } }
                },
                {
                    "id": "vibe-check",
                    "category": "sentiment",
                    "input_schema": { "properties": { "text": {} } },
                    "output_schema": { "properties": { "analysis": {}, "text": {} } }
                },
                {
                    "id": "check-hallucination",
                    "category": "verification",
                    "input_schema": { "properties": { "text": {} } }
                }
            ],
            "count": 3
        }))
        .unwrap();
        ServiceRegistry::from_snapshot(&snapshot)
    }

    #[test]
    fn test_declared_input_schema_is_compatible() {
        let pipeline = Pipeline::market_intelligence();
        let source = pipeline.step("btc-price").unwrap();
        let target = pipeline.step("vibe-check").unwrap();

        // No overlapping field names, but the target declares an input
        // schema, so the pair is reported compatible with nothing shared.
        let result = check(source, target, &registry());
        assert_eq!(result, SchemaCompat::Compatible { shared: vec![] });
    }

    #[test]
    fn test_shared_fields_are_listed() {
        let pipeline = Pipeline::market_intelligence();
        let source = pipeline.step("vibe-check").unwrap();
        let target = pipeline.step("check-hallucination").unwrap();

        match check(source, target, &registry()) {
            SchemaCompat::Compatible { shared } => assert_eq!(shared, vec!["text"]),
            other => panic!("expected Compatible, got {:?}", other),
        }
    }

    #[test]
    fn test_no_declared_input_means_custom_mapping() {
        let pipeline = Pipeline::market_intelligence();
        let source = pipeline.step("vibe-check").unwrap();
        // btc-price declares no input schema, and reversing the pair makes
        // it the target with no assumed fields either.
        let mut target = pipeline.step("btc-price").unwrap().clone();
        target.expected_input.clear();

        assert_eq!(check(source, &target, &registry()), SchemaCompat::CustomMapping);
    }

    #[test]
    fn test_undeclared_step_uses_assumed_fields() {
        let pipeline = Pipeline::code_analysis("q");
        let source = pipeline.step("ext-search-v2").unwrap();
        let target = pipeline.step("code-analyze").unwrap();

        // code-analyze is not in the registry; its assumed input fields
        // still make the pair reportable.
        match check(source, target, &registry()) {
            SchemaCompat::Compatible { shared } => assert!(shared.is_empty()),
            other => panic!("expected Compatible, got {:?}", other),
        }
    }
}
