//! Step input composition
//!
//! Composers are pure, total functions from the outputs accumulated so
//! far to the next request payload. Every field read falls back to a
//! default when the source step failed or was blocked, so a hole in the
//! outputs map degrades the payload instead of crashing the run.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Upstream text is capped before being embedded in a downstream prompt
pub const UPSTREAM_TEXT_CAP: usize = 300;

/// Outputs recorded so far in a run, keyed by step id.
///
/// Grows monotonically; holds the payload of every Succeeded and Failed
/// step, never Blocked ones.
#[derive(Debug, Clone, Default)]
pub struct OutputsMap {
    outputs: HashMap<String, Value>,
}

impl OutputsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, step_id: &str, output: Value) {
        self.outputs.insert(step_id.to_string(), output);
    }

    pub fn get(&self, step_id: &str) -> Option<&Value> {
        self.outputs.get(step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.outputs.contains_key(step_id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// String field of a step's output, or the given default
    pub fn text_or(&self, step_id: &str, field: &str, default: &str) -> String {
        self.get(step_id)
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }

    /// String field of a step's output, if present
    pub fn text(&self, step_id: &str, field: &str) -> Option<&str> {
        self.get(step_id)
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_str())
    }

    /// Numeric field of a step's output, if present
    pub fn number(&self, step_id: &str, field: &str) -> Option<f64> {
        self.get(step_id)
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_f64())
    }

    /// Array field of a step's output, or empty
    pub fn list(&self, step_id: &str, field: &str) -> Vec<Value> {
        self.get(step_id)
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
    }
}

/// Format a price-like number the way the services report it, with
/// thousands separators on whole amounts ("64,250")
fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        group_thousands(value as i64)
    } else {
        format!("{}", value)
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn cap(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(UPSTREAM_TEXT_CAP)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

/// The payload builders a step can be bound to.
///
/// Bound once when the pipeline is assembled, not looked up by name at
/// call time, so a pipeline with an unknown composer cannot be built.
/// Variants carrying data hold pipeline-level input (the user's query)
/// that no upstream output can supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Composer {
    /// Market narrative for sentiment analysis, from the price oracle
    MarketSentiment,
    /// Claim summary for hallucination checking, from price + sentiment
    AnalysisVerification,
    /// Final market report plus the schema it must satisfy
    ReportValidation,
    /// Code analysis report plus its schema, from the analyzer output
    CodeReportValidation,
    /// Spanish translation request over the search answer
    SpanishTranslation,
    /// Summarization prompt over translated (or raw) search text,
    /// falling back to the original query when the search produced
    /// nothing
    SearchSummary { fallback_query: String },
    /// Code review request derived from search results
    CodeReview,
    /// Image generation request for the query
    ImagePrompt { prompt: String },
    /// Vibe assessment of the visual concept, over search context
    ImageVibe { query: String },
}

impl Composer {
    /// Build the request payload from prior outputs. Total: any missing
    /// or malformed upstream field is replaced by its default.
    pub fn compose(&self, outputs: &OutputsMap) -> Value {
        match self {
            Composer::MarketSentiment => {
                let price = outputs
                    .number("btc-price", "price")
                    .map(format_amount)
                    .unwrap_or_else(|| "unknown".to_string());
                let change = outputs.number("btc-price", "change_24h").unwrap_or(0.0);
                let direction = if change > 0.0 { "up" } else { "down" };
                let mood = if change > 1.0 {
                    "bullish momentum"
                } else if change < -1.0 {
                    "bearish pressure"
                } else {
                    "sideways consolidation"
                };
                json!({
                    "text": format!(
                        "Bitcoin is at ${} USD, {} {:.1}% in 24h. The market shows {}. \
                         Lightning Network adoption continues accelerating with AI agents \
                         driving micropayment volume.",
                        price, direction, change.abs(), mood
                    )
                })
            }
            Composer::AnalysisVerification => {
                let price = outputs
                    .number("btc-price", "price")
                    .map(format_amount)
                    .unwrap_or_else(|| "0".to_string());
                let analysis = outputs.text_or("vibe-check", "analysis", "unknown");
                let score = outputs
                    .number("vibe-check", "vibe_score")
                    .map(format_amount)
                    .unwrap_or_else(|| "N/A".to_string());
                let energy = outputs.text_or("vibe-check", "energy", "unknown");
                json!({
                    "text": format!(
                        "Market analysis: Bitcoin at ${}. Sentiment: {}. \
                         Vibe score: {}/10. Energy: {}.",
                        price, analysis, score, energy
                    )
                })
            }
            Composer::ReportValidation => {
                let report = crate::report::build_market_report(outputs);
                json!({
                    "payload": report.to_value(),
                    "schema": {
                        "type": "object",
                        "required": ["price", "sentiment", "verified", "pipeline"],
                    }
                })
            }
            Composer::SpanishTranslation => {
                let answer = outputs.text_or("ext-search-v2", "answer", "");
                json!({
                    "text": cap(&answer),
                    "target_lang": "es",
                })
            }
            Composer::SearchSummary { fallback_query } => {
                // Prefer the translated text; if the translation step was
                // blocked or failed, summarize the raw search answer, and
                // with no search answer at all fall back to the query.
                let source = outputs
                    .text("translate", "translated_text")
                    .or_else(|| outputs.text("ext-search-v2", "answer"))
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback_query.clone());
                json!({
                    "text": format!(
                        "Summarize for a Spanish-speaking audience: {}",
                        cap(&source)
                    )
                })
            }
            Composer::CodeReview => {
                let answer = outputs.text_or("ext-search-v2", "answer", "");
                json!({
                    "code": cap(&answer),
                    "language": "python",
                    "checks": ["security", "performance", "style"],
                })
            }
            Composer::CodeReportValidation => {
                json!({
                    "payload": {
                        "issues": outputs.list("code-analyze", "issues"),
                        "score": outputs.number("code-analyze", "score").unwrap_or(0.0),
                        "language": outputs.text_or("code-analyze", "language", "python"),
                    },
                    "schema": {
                        "type": "object",
                        "required": ["issues", "score", "language"],
                        "properties": {
                            "issues": { "type": "array" },
                            "score": { "type": "number", "minimum": 0, "maximum": 100 },
                            "language": { "type": "string" },
                        },
                    }
                })
            }
            Composer::ImagePrompt { prompt } => {
                json!({
                    "prompt": prompt,
                    "style": "digital-art",
                    "width": 1024,
                    "height": 1024,
                })
            }
            Composer::ImageVibe { query } => {
                let context = outputs
                    .text("ext-search-v2", "answer")
                    .map(|answer| answer.chars().take(100).collect::<String>())
                    .unwrap_or_else(|| query.clone());
                let text = format!("Visual concept for: {}. {}", query, context);
                json!({ "text": cap(&text) })
            }
        }
    }
}
