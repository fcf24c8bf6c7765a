//! Pipeline state and the stage transition function.
//!
//! One `PipelineState` exists per run, owned exclusively by the
//! orchestrator. Stages read prior fields and append their own; the
//! `stage` field is mutated only by the transition function here, never
//! by a backend.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Fix, Research, Vulnerability};
use crate::workspace::PullRequest;

/// Pipeline stages, in normal order of progression.
///
/// COMPLETE and ERROR are terminal; ERROR is reachable from every
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Initialize,
    Scan,
    Research,
    GenerateFixes,
    Review,
    Publish,
    Complete,
    Error,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initialize => "INITIALIZE",
            Self::Scan => "SCAN",
            Self::Research => "RESEARCH",
            Self::GenerateFixes => "GENERATE_FIXES",
            Self::Review => "REVIEW",
            Self::Publish => "PUBLISH",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// The shared state threaded through all pipeline stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Run identifier
    pub run_id: Uuid,

    /// Target repository URL; immutable after creation
    pub repo_url: String,

    /// Local checkout path, set by the initialize stage
    pub repo_path: Option<PathBuf>,

    /// Remediation branch, set by the initialize stage
    pub branch_name: Option<String>,

    /// Current stage; mutated only by `advance` and `fail`
    pub stage: Stage,

    /// Failure reason; once set it is permanent for the run
    pub error: Option<String>,

    /// Findings, written once by the scan stage
    pub vulnerabilities: Vec<Vulnerability>,

    /// Research keyed by vulnerability id, written by the research stage
    pub research: HashMap<String, Research>,

    /// Proposed fixes; the review stage annotates review status in place
    pub fixes: Vec<Fix>,

    /// The opened pull request, set by the publish stage
    pub pull_request: Option<PullRequest>,

    /// Run summary, set by the publish stage
    pub summary: Option<String>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal stage
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    /// Create the state for a new run
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            repo_url: repo_url.into(),
            repo_path: None,
            branch_name: None,
            stage: Stage::Initialize,
            error: None,
            vulnerabilities: Vec::new(),
            research: HashMap::new(),
            fixes: Vec::new(),
            pull_request: None,
            summary: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Fixes that passed review. Derived at call time, never stored.
    pub fn approved_fixes(&self) -> Vec<&Fix> {
        self.fixes.iter().filter(|f| f.is_approved()).collect()
    }

    /// The next stage after the current one completed successfully.
    ///
    /// Branching rules:
    /// - SCAN short-circuits to COMPLETE when no vulnerabilities were found
    /// - GENERATE_FIXES short-circuits to COMPLETE when no fixes were proposed
    /// - REVIEW skips PUBLISH when no fix was approved (still a successful run)
    /// - terminal stages map to themselves
    pub fn next_stage(&self) -> Stage {
        match self.stage {
            Stage::Initialize => Stage::Scan,
            Stage::Scan => {
                if self.vulnerabilities.is_empty() {
                    Stage::Complete
                } else {
                    Stage::Research
                }
            }
            Stage::Research => Stage::GenerateFixes,
            Stage::GenerateFixes => {
                if self.fixes.is_empty() {
                    Stage::Complete
                } else {
                    Stage::Review
                }
            }
            Stage::Review => {
                if self.fixes.iter().any(Fix::is_approved) {
                    Stage::Publish
                } else {
                    Stage::Complete
                }
            }
            Stage::Publish => Stage::Complete,
            Stage::Complete => Stage::Complete,
            Stage::Error => Stage::Error,
        }
    }

    /// Apply the transition function. No-op on a terminal stage.
    pub fn advance(&mut self) {
        if self.stage.is_terminal() {
            return;
        }
        self.stage = self.next_stage();
        if self.stage.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
    }

    /// Transition to ERROR with the given reason. The first recorded
    /// error is permanent; later calls do not overwrite it.
    pub fn fail(&mut self, reason: impl std::fmt::Display) {
        if self.error.is_none() {
            self.error = Some(reason.to_string());
        }
        if !self.stage.is_terminal() {
            self.stage = Stage::Error;
            self.completed_at = Some(Utc::now());
        }
    }

    /// Check cross-collection invariants at a stage boundary.
    ///
    /// Research entries and fixes must reference known vulnerability ids,
    /// and each research entry must be keyed by the id it carries.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (key, research) in &self.research {
            if key != &research.vulnerability_id {
                return Err(InvariantViolation::ResearchKeyMismatch {
                    key: key.clone(),
                    id: research.vulnerability_id.clone(),
                });
            }
            if !self.vulnerabilities.iter().any(|v| &v.id == key) {
                return Err(InvariantViolation::UnknownVulnerability { id: key.clone() });
            }
        }
        for fix in &self.fixes {
            if !self
                .vulnerabilities
                .iter()
                .any(|v| v.id == fix.vulnerability_id)
            {
                return Err(InvariantViolation::UnknownVulnerability {
                    id: fix.vulnerability_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Cross-collection invariant violations in the pipeline state
#[derive(Debug, Clone, Error)]
pub enum InvariantViolation {
    #[error("research entry keyed '{key}' carries vulnerability id '{id}'")]
    ResearchKeyMismatch { key: String, id: String },

    #[error("record references unknown vulnerability '{id}'")]
    UnknownVulnerability { id: String },
}
