//! Pipeline configuration from YAML

use crate::core::compose::Composer;
use crate::core::step::{Pipeline, StepDefinition, StepInput};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Pipeline version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Pipeline steps
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Capability id the step invokes
    pub id: String,

    /// Human-readable step name
    pub name: String,

    /// Capability category, for diagnostics and gap reports
    #[serde(default)]
    pub capability: String,

    /// Fixed request payload. Mutually exclusive with `composer`.
    #[serde(default)]
    pub input: Option<serde_yaml::Value>,

    /// Named composer building the payload from prior outputs.
    /// Mutually exclusive with `input`.
    #[serde(default)]
    pub composer: Option<Composer>,

    /// Price charged when the registry declares none for this id
    #[serde(default)]
    pub fallback_price: u64,

    /// Assumed input fields, for gap reports on undeclared services
    #[serde(default)]
    pub expected_input: Vec<String>,

    /// Assumed output fields, same use
    #[serde(default)]
    pub expected_output: Vec<String>,
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("Pipeline '{}' has no steps", self.name);
        }

        // Check that all step IDs are unique
        let mut seen_ids = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen_ids.insert(&step.id) {
                anyhow::bail!("Duplicate step ID: {}", step.id);
            }
        }

        // Each step takes its payload from exactly one source
        for step in &self.steps {
            match (&step.input, &step.composer) {
                (Some(_), Some(_)) => anyhow::bail!(
                    "Step '{}' declares both a static input and a composer",
                    step.id
                ),
                (None, None) => anyhow::bail!(
                    "Step '{}' declares neither a static input nor a composer",
                    step.id
                ),
                _ => {}
            }
        }

        Ok(())
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let input = match (&step.input, &step.composer) {
                (Some(value), None) => StepInput::Static(serde_json::to_value(value)?),
                (None, Some(composer)) => StepInput::Composed(composer.clone()),
                // validate() rejects the other combinations
                _ => anyhow::bail!("Step '{}' has an invalid input source", step.id),
            };

            steps.push(StepDefinition {
                id: step.id.clone(),
                display_name: step.name.clone(),
                capability: step.capability.clone(),
                input,
                fallback_price: step.fallback_price,
                expected_input: step.expected_input.clone(),
                expected_output: step.expected_output.clone(),
            });
        }

        Ok(Pipeline::new(&self.name, steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compose::OutputsMap;
    use serde_json::json;

    #[test]
    fn test_parse_simple_pipeline() {
        let yaml = r#"
name: "market-intel"
version: "1.0"

steps:
  - id: "btc-price"
    name: "Bitcoin Price Oracle"
    capability: "price_oracle"
    input:
      currency: usd
    fallback_price: 5

  - id: "vibe-check"
    name: "Vibe Oracle"
    capability: "sentiment"
    composer: market-sentiment
    fallback_price: 10
    expected_input: [text]
    expected_output: [analysis, vibe_score, energy]
"#;

        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name, "market-intel");
        assert_eq!(config.steps.len(), 2);

        let pipeline = config.to_pipeline().unwrap();
        let btc = pipeline.step("btc-price").unwrap();
        assert_eq!(btc.input.payload(&OutputsMap::new()), json!({ "currency": "usd" }));
        assert_eq!(btc.fallback_price, 5);

        let vibe = pipeline.step("vibe-check").unwrap();
        assert_eq!(vibe.expected_input, vec!["text"]);
        assert!(matches!(vibe.input, StepInput::Composed(Composer::MarketSentiment)));
    }

    #[test]
    fn test_sample_config_matches_builtin_pipeline() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/pipelines/market-intel.yaml");
        let config = PipelineConfig::from_file(path).unwrap();
        let pipeline = config.to_pipeline().unwrap();

        let builtin = crate::core::step::Pipeline::market_intelligence();
        let ids: Vec<_> = pipeline.steps.iter().map(|s| s.id.as_str()).collect();
        let builtin_ids: Vec<_> = builtin.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, builtin_ids);
    }

    #[test]
    fn test_duplicate_step_id_fails() {
        let yaml = r#"
name: "bad"
steps:
  - id: "step1"
    name: "First"
    input: {}
  - id: "step1"
    name: "Duplicate"
    input: {}
"#;

        assert!(PipelineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_both_input_and_composer_fails() {
        let yaml = r#"
name: "bad"
steps:
  - id: "step1"
    name: "First"
    input: { currency: usd }
    composer: market-sentiment
"#;

        assert!(PipelineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_neither_input_nor_composer_fails() {
        let yaml = r#"
name: "bad"
steps:
  - id: "step1"
    name: "First"
"#;

        assert!(PipelineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_pipeline_fails() {
        let yaml = r#"
name: "empty"
steps: []
"#;

        assert!(PipelineConfig::from_yaml(yaml).is_err());
    }
}
