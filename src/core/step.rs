//! Step and pipeline domain models

use crate::core::compose::{Composer, OutputsMap};
use serde_json::{json, Value};

/// Where a step's request payload comes from.
///
/// Exactly one source per step, enforced by the type: either a fixed
/// payload or a composer over prior outputs.
#[derive(Debug, Clone)]
pub enum StepInput {
    /// Fixed payload, independent of prior steps
    Static(Value),
    /// Pure composition over the outputs accumulated so far
    Composed(Composer),
}

impl StepInput {
    /// Build the payload this step would send, given prior outputs
    pub fn payload(&self, outputs: &OutputsMap) -> Value {
        match self {
            StepInput::Static(value) => value.clone(),
            StepInput::Composed(composer) => composer.compose(outputs),
        }
    }
}

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct StepDefinition {
    /// Capability id; may be absent from the registry ("undeclared" is a
    /// valid state and resolves to a Blocked outcome)
    pub id: String,

    /// Human-readable step name
    pub display_name: String,

    /// Capability category, for discovery diagnostics and gap reports
    pub capability: String,

    /// Payload source for this step
    pub input: StepInput,

    /// Price charged when the registry has no declared price for this id
    pub fallback_price: u64,

    /// Input fields this step is assumed to need, used in gap reports
    /// when the registry declares nothing
    pub expected_input: Vec<String>,

    /// Output fields this step is assumed to produce, same use
    pub expected_output: Vec<String>,
}

impl StepDefinition {
    pub fn with_static(
        id: &str,
        display_name: &str,
        capability: &str,
        input: Value,
        fallback_price: u64,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            capability: capability.to_string(),
            input: StepInput::Static(input),
            fallback_price,
            expected_input: Vec::new(),
            expected_output: Vec::new(),
        }
    }

    pub fn with_composer(
        id: &str,
        display_name: &str,
        capability: &str,
        composer: Composer,
        fallback_price: u64,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            capability: capability.to_string(),
            input: StepInput::Composed(composer),
            fallback_price,
            expected_input: Vec::new(),
            expected_output: Vec::new(),
        }
    }

    pub fn expecting(mut self, input: &[&str], output: &[&str]) -> Self {
        self.expected_input = input.iter().map(|s| s.to_string()).collect();
        self.expected_output = output.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// An ordered pipeline of steps.
///
/// Order is the sole dependency order: a composer for step n may read only
/// outputs of steps before it, never forward references.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub steps: Vec<StepDefinition>,
}

impl Pipeline {
    pub fn new(name: &str, steps: Vec<StepDefinition>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Adjacent step pairs, in order, for schema compatibility checks
    pub fn adjacent_pairs(&self) -> Vec<(&StepDefinition, &StepDefinition)> {
        self.steps.windows(2).map(|w| (&w[0], &w[1])).collect()
    }

    /// Market intelligence: price oracle → sentiment → verification →
    /// report validation
    pub fn market_intelligence() -> Self {
        Self::new(
            "market-intel",
            vec![
                StepDefinition::with_static(
                    "btc-price",
                    "Bitcoin Price Oracle",
                    "price_oracle",
                    json!({ "currency": "usd" }),
                    5,
                )
                .expecting(&["currency"], &["price", "change_24h", "provider"]),
                StepDefinition::with_composer(
                    "vibe-check",
                    "Vibe Oracle",
                    "sentiment",
                    Composer::MarketSentiment,
                    10,
                )
                .expecting(&["text"], &["analysis", "vibe_score", "energy"]),
                StepDefinition::with_composer(
                    "check-hallucination",
                    "Hallucination Detector",
                    "verification",
                    Composer::AnalysisVerification,
                    10,
                )
                .expecting(&["text"], &["risk_level", "confidence_score", "warnings"]),
                StepDefinition::with_composer(
                    "validate-schema",
                    "Schema Validator",
                    "validation",
                    Composer::ReportValidation,
                    5,
                )
                .expecting(&["payload", "schema"], &["valid", "details"]),
            ],
        )
    }

    /// Developer tools: search → code analysis → validation. The network
    /// has no code analysis service yet, so the middle step is expected to
    /// come back Blocked and drive a gap report.
    pub fn code_analysis(query: &str) -> Self {
        Self::new(
            "code-analysis",
            vec![
                StepDefinition::with_static(
                    "ext-search-v2",
                    "AI Web Search",
                    "search",
                    json!({ "query": query }),
                    10,
                )
                .expecting(&["query"], &["answer", "source"]),
                StepDefinition::with_composer(
                    "code-analyze",
                    "Code Analyzer",
                    "code_analysis",
                    Composer::CodeReview,
                    25,
                )
                .expecting(
                    &["code", "language", "checks"],
                    &["issues", "score", "suggestions", "complexity"],
                ),
                StepDefinition::with_composer(
                    "validate-schema",
                    "Schema Validator",
                    "validation",
                    Composer::CodeReportValidation,
                    5,
                )
                .expecting(&["payload", "schema"], &["valid", "details"]),
            ],
        )
    }

    /// Creative: search → translate → summarize
    pub fn translation(query: &str) -> Self {
        Self::new(
            "translation",
            vec![
                StepDefinition::with_static(
                    "ext-search-v2",
                    "AI Web Search",
                    "search",
                    json!({ "query": query }),
                    10,
                )
                .expecting(&["query"], &["answer", "source"]),
                StepDefinition::with_composer(
                    "translate",
                    "Text Translation",
                    "translation",
                    Composer::SpanishTranslation,
                    15,
                )
                .expecting(
                    &["text", "target_lang"],
                    &["translated_text", "source_lang", "confidence"],
                ),
                StepDefinition::with_composer(
                    "compress-context",
                    "Context Summarizer",
                    "text",
                    Composer::SearchSummary {
                        fallback_query: query.to_string(),
                    },
                    10,
                )
                .expecting(&["text"], &["compressed"]),
            ],
        )
    }

    /// Creative: search → image generation → vibe assessment. The network
    /// has no image generation service yet, so the middle step is expected
    /// to come back Blocked and drive a gap report.
    pub fn image(query: &str) -> Self {
        Self::new(
            "image",
            vec![
                StepDefinition::with_static(
                    "ext-search-v2",
                    "AI Web Search",
                    "search",
                    json!({ "query": query }),
                    10,
                )
                .expecting(&["query"], &["answer", "source"]),
                StepDefinition::with_composer(
                    "image-generate",
                    "Image Generator",
                    "image_generation",
                    Composer::ImagePrompt {
                        prompt: query.to_string(),
                    },
                    50,
                )
                .expecting(&["prompt", "style", "width"], &["image_url", "seed"]),
                StepDefinition::with_composer(
                    "vibe-check",
                    "Vibe Oracle",
                    "sentiment",
                    Composer::ImageVibe {
                        query: query.to_string(),
                    },
                    10,
                )
                .expecting(&["text"], &["analysis", "vibe_score", "energy"]),
            ],
        )
    }

    /// Built-in pipeline by name
    pub fn builtin(name: &str, query: &str) -> Option<Self> {
        match name {
            "market-intel" => Some(Self::market_intelligence()),
            "code-analysis" => Some(Self::code_analysis(query)),
            "translation" => Some(Self::translation(query)),
            "image" => Some(Self::image(query)),
            _ => None,
        }
    }

    /// Names of the built-in pipelines
    pub fn builtin_names() -> &'static [&'static str] {
        &["market-intel", "code-analysis", "translation", "image"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_payload_ignores_outputs() {
        let step = StepDefinition::with_static(
            "btc-price",
            "Bitcoin Price Oracle",
            "price_oracle",
            json!({ "currency": "usd" }),
            5,
        );

        let payload = step.input.payload(&OutputsMap::new());
        assert_eq!(payload, json!({ "currency": "usd" }));
    }

    #[test]
    fn test_composed_payload_reads_outputs() {
        let step = StepDefinition::with_composer(
            "vibe-check",
            "Vibe Oracle",
            "sentiment",
            Composer::MarketSentiment,
            10,
        );

        let mut outputs = OutputsMap::new();
        outputs.insert("btc-price", json!({ "price": 7, "change_24h": 0.0 }));

        let payload = step.input.payload(&outputs);
        assert!(payload["text"].as_str().unwrap().contains("$7"));
    }

    #[test]
    fn test_builtin_pipelines_exist() {
        for name in Pipeline::builtin_names() {
            let pipeline = Pipeline::builtin(name, "test query").unwrap();
            assert!(!pipeline.steps.is_empty());
            assert_eq!(&pipeline.name, name);
        }
        assert!(Pipeline::builtin("unknown", "q").is_none());
    }

    #[test]
    fn test_code_analysis_validates_a_code_shaped_report() {
        let pipeline = Pipeline::code_analysis("q");
        let validate = pipeline.step("validate-schema").unwrap();

        let payload = validate.input.payload(&OutputsMap::new());
        let required: Vec<_> = payload["schema"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["issues", "score", "language"]);
    }

    #[test]
    fn test_image_pipeline_threads_the_query() {
        let pipeline = Pipeline::image("cyberpunk Bitcoin city");
        let ids: Vec<_> = pipeline.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["ext-search-v2", "image-generate", "vibe-check"]);

        let prompt = pipeline.step("image-generate").unwrap();
        let payload = prompt.input.payload(&OutputsMap::new());
        assert_eq!(payload["prompt"], "cyberpunk Bitcoin city");

        let vibe = pipeline.step("vibe-check").unwrap();
        let payload = vibe.input.payload(&OutputsMap::new());
        assert!(payload["text"]
            .as_str()
            .unwrap()
            .starts_with("Visual concept for: cyberpunk Bitcoin city"));
    }

    #[test]
    fn test_adjacent_pairs_preserve_order() {
        let pipeline = Pipeline::market_intelligence();
        let pairs = pipeline.adjacent_pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].0.id, "btc-price");
        assert_eq!(pairs[0].1.id, "vibe-check");
        assert_eq!(pairs[2].1.id, "validate-schema");
    }
}
