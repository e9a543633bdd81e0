//! Pipeline execution engine for satpipe

pub mod engine;
pub mod executor;
pub mod outcome;

pub use engine::{EngineError, EventHandler, ExecutionEngine, ExecutionEvent, PipelineRun};
pub use executor::{AttemptOutcome, PaymentMode, StepExecutor};
pub use outcome::{OutcomeState, StepOutcome};
