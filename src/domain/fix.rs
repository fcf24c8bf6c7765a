//! Fix records and review status.
//!
//! A Fix is written by the generate-fixes stage with `review_status`
//! PENDING. The review stage resolves the status exactly once; the code
//! fields are never touched after generation.

use serde::{Deserialize, Serialize};

use super::vulnerability::Vulnerability;

/// A proposed code fix for one vulnerability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fix {
    /// Id of the vulnerability this fix addresses
    pub vulnerability_id: String,

    /// Path of the file to patch, relative to the repository root
    pub file_path: String,

    /// The vulnerable code being replaced
    pub original_code: String,

    /// The proposed replacement
    pub fixed_code: String,

    /// Why the fix is correct, from the fixer backend
    pub explanation: String,

    /// Fixer confidence in [0.0, 1.0]
    pub confidence: f64,

    /// Review outcome; PENDING until the review stage resolves it
    pub review_status: ReviewStatus,

    /// Reviewer comments, set by the review stage
    #[serde(default)]
    pub review_comments: Option<String>,

    /// Security assessment score (0-100), set by the review stage
    #[serde(default)]
    pub security_score: Option<u8>,

    /// True when the fixer backend's response could not be parsed and
    /// this record was degraded instead of aborting the run
    #[serde(default)]
    pub parse_failed: bool,
}

impl Fix {
    /// A placeholder fix for a vulnerability whose fixer call did not
    /// produce a usable result. Degraded to NEEDS_REVISION so a human
    /// picks it up; the run continues. `parse_failed` marks the
    /// unparseable-response case as opposed to an outright backend
    /// failure.
    pub fn degraded(vuln: &Vulnerability, reason: impl Into<String>, parse_failed: bool) -> Self {
        Self {
            vulnerability_id: vuln.id.clone(),
            file_path: vuln.file_path.clone(),
            original_code: vuln.code_snippet.clone(),
            fixed_code: String::new(),
            explanation: reason.into(),
            confidence: 0.0,
            review_status: ReviewStatus::NeedsRevision,
            review_comments: None,
            security_score: None,
            parse_failed,
        }
    }

    /// Record a review verdict. Returns false (and changes nothing) if the
    /// status was already resolved; the transition out of PENDING happens
    /// exactly once.
    pub fn resolve_review(&mut self, verdict: ReviewVerdict) -> bool {
        if self.review_status != ReviewStatus::Pending {
            return false;
        }
        self.review_status = verdict.status;
        self.review_comments = Some(verdict.comments);
        self.security_score = Some(verdict.score);
        true
    }

    pub fn is_approved(&self) -> bool {
        self.review_status == ReviewStatus::Approved
    }
}

/// Review status of a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// Not yet reviewed
    Pending,

    /// Approved for publishing
    Approved,

    /// Requires human attention before it can ship
    NeedsRevision,

    /// Rejected outright
    Rejected,
}

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Outcome of one reviewer backend call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// Resolved status (never PENDING)
    pub status: ReviewStatus,

    /// Reviewer commentary
    #[serde(default)]
    pub comments: String,

    /// Security assessment score (0-100)
    #[serde(default)]
    pub score: u8,
}
