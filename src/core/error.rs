//! Error taxonomy for pipeline runs.

use thiserror::Error;

use crate::backends::BackendError;
use crate::workspace::WorkspaceError;

use super::state::{InvariantViolation, Stage};

/// Run-level failures.
///
/// These never escape the orchestrator as raised errors; they are
/// converted into the terminal ERROR stage and surface in the
/// `RunResult.error` field.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Workspace acquisition failed (clone/branch); nothing to salvage
    #[error("workspace setup failed: {0}")]
    Setup(WorkspaceError),

    /// A stage backend call failed outright. Fatal for scan/research;
    /// fix/review failures degrade per item instead of raising this.
    #[error("{stage} backend failed: {source}")]
    Backend { stage: Stage, source: BackendError },

    /// A stage produced records violating the state invariants
    #[error("state invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Commit or PR creation failed after fixes had been approved. The
    /// approved count is carried so the report can distinguish "fixes
    /// decided" from "fixes published".
    #[error("publish failed after {approved_fixes} fixes were approved: {source}")]
    Publish {
        approved_fixes: usize,
        source: WorkspaceError,
    },

    /// External cancellation observed at a stage boundary
    #[error("run cancelled")]
    Cancelled,
}
