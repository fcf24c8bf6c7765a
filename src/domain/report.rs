//! Run results reported to callers.
//!
//! A `RunResult` is the only thing `Orchestrator::run` ever returns: raw
//! backend errors never escape, they surface here as the `error` field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::state::{PipelineState, Stage};
use crate::workspace::PullRequest;

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Run identifier
    pub run_id: Uuid,

    /// Final stage: COMPLETE or ERROR
    pub stage: Stage,

    /// Number of vulnerabilities the scanner reported
    pub vulnerabilities_found: usize,

    /// Number of fixes that passed review (decided, whether or not the
    /// publish stage managed to ship them)
    pub fixes_applied: usize,

    /// The opened pull request, if the publish stage ran
    pub pull_request: Option<PullRequestOutcome>,

    /// Human-readable summary of the run
    pub summary: String,

    /// Failure reason when `stage` is ERROR
    pub error: Option<String>,
}

/// Pull-request details for the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestOutcome {
    pub url: String,
    pub number: u64,
    pub created: bool,
}

impl From<&PullRequest> for PullRequestOutcome {
    fn from(pr: &PullRequest) -> Self {
        Self {
            url: pr.url.clone(),
            number: pr.number,
            created: true,
        }
    }
}

impl RunResult {
    /// Build the report from a finished pipeline state.
    pub fn from_state(state: &PipelineState) -> Self {
        let fixes_applied = state.approved_fixes().len();
        let summary = state
            .summary
            .clone()
            .unwrap_or_else(|| summarize(state, fixes_applied));

        Self {
            run_id: state.run_id,
            stage: state.stage,
            vulnerabilities_found: state.vulnerabilities.len(),
            fixes_applied,
            pull_request: state.pull_request.as_ref().map(PullRequestOutcome::from),
            summary,
            error: state.error.clone(),
        }
    }
}

/// Summary wording for runs that never reached the publish stage.
///
/// "Nothing found" and "found but nothing approved" are distinct outcomes
/// and get distinct wording.
fn summarize(state: &PipelineState, fixes_applied: usize) -> String {
    if let Some(ref error) = state.error {
        return format!("Run failed: {error}");
    }
    if state.vulnerabilities.is_empty() {
        return format!(
            "No vulnerabilities detected in {}; nothing to remediate.",
            state.repo_url
        );
    }
    if state.fixes.is_empty() {
        return format!(
            "{} vulnerabilities found in {} but no fixes were proposed; no pull request opened.",
            state.vulnerabilities.len(),
            state.repo_url
        );
    }
    if fixes_applied == 0 {
        return format!(
            "{} vulnerabilities found in {}; {} fixes proposed but none passed review; no pull request opened.",
            state.vulnerabilities.len(),
            state.repo_url,
            state.fixes.len()
        );
    }
    format!(
        "{} vulnerabilities found in {}; {} fixes approved.",
        state.vulnerabilities.len(),
        state.repo_url,
        fixes_applied
    )
}
