//! Domain types for the aegis pipeline.
//!
//! This module contains the record types threaded through the pipeline:
//! - Vulnerability: scan-stage findings
//! - Research: remediation research per vulnerability
//! - Fix: proposed code changes and their review status
//! - RunResult: the report returned to callers

pub mod fix;
pub mod report;
pub mod research;
pub mod vulnerability;

// Re-export commonly used types
pub use fix::{Fix, ReviewStatus, ReviewVerdict};
pub use report::{PullRequestOutcome, RunResult};
pub use research::Research;
pub use vulnerability::{InvalidRecord, Severity, Vulnerability};
