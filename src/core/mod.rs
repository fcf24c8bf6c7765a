//! Core orchestration logic.
//!
//! This module contains:
//! - State: the pipeline state record and stage transition function
//! - Error: the run-level error taxonomy
//! - Orchestrator: the state machine driving the five stages

pub mod error;
pub mod orchestrator;
pub mod state;

// Re-export commonly used types
pub use error::PipelineError;
pub use orchestrator::Orchestrator;
pub use state::{InvariantViolation, PipelineState, Stage};
