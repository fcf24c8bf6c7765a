//! Research records produced by the research stage.

use serde::{Deserialize, Serialize};

/// Remediation research for one vulnerability.
///
/// Keyed by `vulnerability_id` in the pipeline state; immutable once the
/// research stage completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Research {
    /// Id of the vulnerability this research belongs to
    pub vulnerability_id: String,

    /// Free-form analysis (root cause, attack vectors, impact)
    pub analysis: String,

    /// Recommended remediation approach
    #[serde(default)]
    pub recommendation: String,
}

impl Research {
    pub fn new(
        vulnerability_id: impl Into<String>,
        analysis: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            vulnerability_id: vulnerability_id.into(),
            analysis: analysis.into(),
            recommendation: recommendation.into(),
        }
    }
}
