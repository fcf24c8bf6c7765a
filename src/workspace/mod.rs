//! Workspace management for the target repository.
//!
//! The workspace owns the local checkout of the repository under
//! remediation: clone, branch creation, patching, commit, pull request,
//! cleanup. The orchestrator consumes it through the `Workspace` trait so
//! tests can substitute an in-memory implementation.

pub mod git;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use git::GitWorkspace;

/// An opened pull request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Web URL of the pull request
    pub url: String,

    /// PR number
    pub number: u64,

    /// PR state as reported by the forge (e.g. "open")
    pub status: String,
}

/// Trait for repository workspaces
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Clone the repository, returning the local checkout path
    async fn clone_repository(&self, repo_url: &str) -> Result<PathBuf, WorkspaceError>;

    /// Create and check out a branch in the cloned repository
    async fn create_branch(&self, name: &str) -> Result<(), WorkspaceError>;

    /// Replace the first occurrence of `original` with `fixed` in the file
    /// at `file_path` (relative to the repository root)
    async fn apply_fix(
        &self,
        file_path: &Path,
        original: &str,
        fixed: &str,
    ) -> Result<(), WorkspaceError>;

    /// Commit staged changes. With `files` set, only those paths are
    /// staged; otherwise everything is.
    async fn commit(&self, message: &str, files: Option<&[PathBuf]>) -> Result<(), WorkspaceError>;

    /// Open a pull request for the current branch
    async fn open_pull_request(&self, title: &str, body: &str)
        -> Result<PullRequest, WorkspaceError>;

    /// Tear down the workspace. Idempotent and best-effort: failures are
    /// logged by the implementation, never raised.
    async fn cleanup(&self);
}

/// Workspace operation failures
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to clone {repo_url}: {message}")]
    Clone { repo_url: String, message: String },

    #[error("no repository has been cloned yet")]
    State,

    #[error("nothing to commit")]
    NoChanges,

    #[error("could not locate the original snippet in {file_path}")]
    PatchMismatch { file_path: String },

    #[error("git command failed: {message}")]
    Command { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
