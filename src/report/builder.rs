//! Final report composition
//!
//! Pure projection from whatever landed in the outputs map into the
//! fixed-shape market intelligence report. Every read has a default, so
//! the builder never fails, even on an empty map.

use crate::core::OutputsMap;
use serde::Serialize;
use serde_json::Value;

/// Number of paid services a full market-intel run touches
const SERVICES_USED: u64 = 4;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceSection {
    pub btc_usd: f64,
    pub change_24h: f64,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SentimentSection {
    pub analysis: String,
    pub vibe_score: f64,
    pub energy: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerificationSection {
    pub hallucination_risk: String,
    pub confidence: f64,
    pub warnings: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineSection {
    pub services_used: u64,
    pub protocol: String,
    pub payment: String,
}

/// The composed market intelligence report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketReport {
    pub price: PriceSection,
    pub sentiment: SentimentSection,
    pub verified: VerificationSection,
    pub pipeline: PipelineSection,
}

impl MarketReport {
    /// Report as an opaque payload for the schema validation step
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Project the outputs map into the report shape. Deterministic and
/// total: absent steps or fields contribute their defaults.
pub fn build_market_report(outputs: &OutputsMap) -> MarketReport {
    MarketReport {
        price: PriceSection {
            btc_usd: outputs.number("btc-price", "price").unwrap_or(0.0),
            change_24h: outputs.number("btc-price", "change_24h").unwrap_or(0.0),
            provider: outputs.text_or("btc-price", "provider", ""),
        },
        sentiment: SentimentSection {
            analysis: outputs.text_or("vibe-check", "analysis", ""),
            vibe_score: outputs.number("vibe-check", "vibe_score").unwrap_or(0.0),
            energy: outputs.text_or("vibe-check", "energy", ""),
        },
        verified: VerificationSection {
            hallucination_risk: outputs.text_or("check-hallucination", "risk_level", ""),
            confidence: outputs
                .number("check-hallucination", "confidence_score")
                .unwrap_or(0.0),
            warnings: outputs.list("check-hallucination", "warnings"),
        },
        pipeline: PipelineSection {
            services_used: SERVICES_USED,
            protocol: "d3p".to_string(),
            payment: "L402 Lightning".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_map_yields_all_defaults() {
        let report = build_market_report(&OutputsMap::new());
        assert_eq!(report.price.btc_usd, 0.0);
        assert_eq!(report.sentiment.analysis, "");
        assert!(report.verified.warnings.is_empty());
        assert_eq!(report.pipeline.protocol, "d3p");
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut outputs = OutputsMap::new();
        outputs.insert("btc-price", json!({ "price": 64250, "change_24h": -1.2 }));
        outputs.insert("vibe-check", json!({ "analysis": "cautious", "vibe_score": 4 }));

        let first = build_market_report(&outputs);
        let second = build_market_report(&outputs);
        assert_eq!(first, second);
        assert_eq!(first.to_value(), second.to_value());
    }

    #[test]
    fn test_report_reads_all_three_upstream_steps() {
        let mut outputs = OutputsMap::new();
        outputs.insert(
            "btc-price",
            json!({ "price": 64250, "change_24h": 2.3, "provider": "coingecko" }),
        );
        outputs.insert(
            "vibe-check",
            json!({ "analysis": "euphoric", "vibe_score": 9, "energy": "high" }),
        );
        outputs.insert(
            "check-hallucination",
            json!({ "risk_level": "low", "confidence_score": 0.92, "warnings": ["sample size"] }),
        );

        let report = build_market_report(&outputs);
        assert_eq!(report.price.btc_usd, 64250.0);
        assert_eq!(report.price.provider, "coingecko");
        assert_eq!(report.sentiment.vibe_score, 9.0);
        assert_eq!(report.verified.hallucination_risk, "low");
        assert_eq!(report.verified.warnings, vec![json!("sample size")]);

        let value = report.to_value();
        assert_eq!(value["pipeline"]["payment"], "L402 Lightning");
    }
}
