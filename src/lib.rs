//! aegis - automated security-remediation pipeline
//!
//! Given a source repository, aegis discovers vulnerabilities, researches
//! remediation approaches, generates code fixes, reviews them, and opens
//! a pull request bundling the approved fixes.
//!
//! # Architecture
//!
//! The system is a finite-state pipeline:
//! - The orchestrator sequences five stages (scan, research, fix, review,
//!   publish) over one shared `PipelineState`
//! - Stage work is delegated to pluggable backends behind narrow traits
//! - Any stage failure becomes a terminal ERROR state; partial results
//!   are kept, and callers always receive a `RunResult`
//!
//! # Modules
//!
//! - `backends`: stage backend traits and the Ollama implementation
//! - `core`: orchestration logic (state machine, transitions, errors)
//! - `domain`: record types (Vulnerability, Research, Fix, RunResult)
//! - `workspace`: repository checkout management (clone, branch, commit, PR)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Remediate a repository
//! aegis run https://github.com/org/repo.git
//!
//! # Inspect resolved configuration
//! aegis config
//! ```

pub mod backends;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod workspace;

// Re-export main types at crate root for convenience
pub use core::{Orchestrator, PipelineError, PipelineState, Stage};
pub use domain::{Fix, Research, ReviewStatus, ReviewVerdict, RunResult, Severity, Vulnerability};
pub use workspace::{GitWorkspace, PullRequest, Workspace, WorkspaceError};
