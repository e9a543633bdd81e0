//! Post-run reporting: composed result and cost/latency stats

pub mod builder;
pub mod stats;

pub use builder::{build_market_report, MarketReport};
pub use stats::{summarize, RunStats, StepStat};
