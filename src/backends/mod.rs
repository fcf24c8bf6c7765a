//! Backend interfaces for the pipeline stages.
//!
//! Each stage delegates its actual security work to a backend: scanning,
//! research, fix generation, review. Backends are stateless
//! request/response ports; they communicate with the orchestrator only
//! through return values and never touch pipeline state directly.
//!
//! One concrete implementation ships (`OllamaBackend`); the orchestrator
//! is written against the traits so alternative providers drop in at
//! configuration time.

pub mod ollama;
pub mod parse;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Fix, Research, ReviewVerdict, Vulnerability};

pub use ollama::OllamaBackend;
pub use parse::ParseOutcome;

/// Scans a repository checkout for vulnerabilities
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan the checkout at `repo_path`. An empty result is a valid
    /// outcome, not an error.
    async fn scan(&self, repo_path: &Path) -> Result<Vec<Vulnerability>, BackendError>;
}

/// Researches remediation approaches for one vulnerability
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, vulnerability: &Vulnerability) -> Result<Research, BackendError>;
}

/// Proposes a code fix for one vulnerability
#[async_trait]
pub trait Fixer: Send + Sync {
    /// A response that cannot be parsed into a well-formed Fix comes back
    /// as `ParseOutcome::Unparseable` rather than an error; the
    /// orchestrator degrades that single fix and keeps going.
    async fn propose_fix(
        &self,
        vulnerability: &Vulnerability,
        research: &Research,
    ) -> Result<ParseOutcome<Fix>, BackendError>;
}

/// Reviews one proposed fix
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(&self, fix: &Fix) -> Result<ParseOutcome<ReviewVerdict>, BackendError>;
}

/// Backend call failures
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned a malformed response: {0}")]
    Malformed(String),

    #[error(transparent)]
    InvalidRecord(#[from] crate::domain::InvalidRecord),
}
