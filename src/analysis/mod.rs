//! Diagnostics computed off the registry and outputs map

pub mod gap;

pub use gap::{analyze, GapReport, PriceBand};
