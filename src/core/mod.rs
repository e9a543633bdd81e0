//! Core domain models for satpipe
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, composers and the discovered service registry.

pub mod compose;
pub mod config;
pub mod registry;
pub mod schema;
pub mod step;

pub use compose::{Composer, OutputsMap};
pub use registry::{ServiceDescriptor, ServiceRegistry};
pub use schema::SchemaCompat;
pub use step::{Pipeline, StepDefinition, StepInput};
