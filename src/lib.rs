//! satpipe - chain paid d3p micro-services into sequential pipelines

pub mod analysis;
pub mod cli;
pub mod core;
pub mod execution;
pub mod report;
pub mod transport;

// Re-export commonly used types
pub use analysis::{GapReport, PriceBand};
pub use core::{Composer, OutputsMap, Pipeline, ServiceRegistry, StepDefinition, StepInput};
pub use execution::{
    EngineError, ExecutionEngine, ExecutionEvent, OutcomeState, PaymentMode, PipelineRun,
    StepOutcome,
};
pub use report::{build_market_report, summarize, MarketReport, RunStats};
pub use transport::{
    DiscoverySnapshot, HttpTransport, InvoiceDescriptor, PaymentAuth, ResponseStatus,
    ServiceResponse, ServiceTransport, TransportConfig, TransportError,
};
