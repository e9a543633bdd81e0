//! CLI command definitions

use crate::core::{config::PipelineConfig, Pipeline};
use anyhow::{Context, Result};
use clap::Args;

/// Run a pipeline against the d3p network
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Built-in pipeline name (market-intel, code-analysis, translation)
    #[arg(short, long, default_value = "market-intel")]
    pub pipeline: String,

    /// Path to a pipeline YAML file (overrides --pipeline)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Query for pipelines whose first step is a search
    #[arg(short, long, default_value = "Bitcoin Lightning Network adoption statistics")]
    pub query: String,

    /// Settle payment challenges with real invoices instead of the
    /// certification-test bypass
    #[arg(long)]
    pub live: bool,

    /// Print the composed report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show the services discovered on the network
#[derive(Debug, Args, Clone)]
pub struct DiscoverCommand {
    /// Also query the discovery network for a specific capability
    #[arg(short = 'c', long)]
    pub capability: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Check a pipeline against the network without executing it
#[derive(Debug, Args, Clone)]
pub struct CheckCommand {
    /// Built-in pipeline name
    #[arg(short, long, default_value = "market-intel")]
    pub pipeline: String,

    /// Path to a pipeline YAML file (overrides --pipeline)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Query for pipelines whose first step is a search
    #[arg(short, long, default_value = "Bitcoin Lightning Network adoption statistics")]
    pub query: String,
}

/// Resolve a pipeline from a YAML file or a built-in name
pub fn load_pipeline(name: &str, file: Option<&str>, query: &str) -> Result<Pipeline> {
    if let Some(path) = file {
        let config = PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load pipeline config from {}", path))?;
        return config.to_pipeline();
    }

    Pipeline::builtin(name, query).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown pipeline '{}'; built-ins are: {}",
            name,
            Pipeline::builtin_names().join(", ")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_builtin_pipeline() {
        let pipeline = load_pipeline("translation", None, "rust traits").unwrap();
        assert_eq!(pipeline.name, "translation");
        assert_eq!(
            pipeline.steps[0].input.payload(&crate::core::OutputsMap::new())["query"],
            "rust traits"
        );
    }

    #[test]
    fn test_unknown_pipeline_names_the_builtins() {
        let err = load_pipeline("nope", None, "q").unwrap_err();
        assert!(err.to_string().contains("market-intel"));
    }
}
