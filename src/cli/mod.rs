//! Command-line interface

pub mod commands;
pub mod output;

use crate::transport::TransportConfig;
use clap::{Parser, Subcommand};
use commands::{CheckCommand, DiscoverCommand, RunCommand};
use std::ffi::OsString;
use std::time::Duration;

/// Orchestrator for paid d3p micro-service pipelines
#[derive(Debug, Parser, Clone)]
#[command(name = "satpipe")]
#[command(version = "0.1.0")]
#[command(about = "Chain paid d3p micro-services into pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL for service invocations
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Base URL for the discovery network
    #[arg(long, global = true)]
    pub discovery_url: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, global = true, default_value_t = 15)]
    pub timeout_secs: u64,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline
    Run(RunCommand),

    /// Show discovered services
    Discover(DiscoverCommand),

    /// Check pipeline availability and schema compatibility
    Check(CheckCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Transport configuration from the global flags
    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::new().with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(discovery_url) = &self.discovery_url {
            config = config.with_discovery_url(discovery_url.clone());
        }
        config
    }
}
