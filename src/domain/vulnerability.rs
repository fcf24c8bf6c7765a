//! Vulnerability records produced by the scan stage.
//!
//! Records are immutable once the scan stage has written them into the
//! pipeline state; later stages only read them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single vulnerability discovered in the target repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Unique identifier within a run (assigned by the scanner backend)
    pub id: String,

    /// Short human-readable title
    pub title: String,

    /// Detailed description of the finding
    #[serde(default)]
    pub description: String,

    /// Severity rating
    pub severity: Severity,

    /// CWE identifier, when the scanner can classify the finding
    #[serde(default)]
    pub cwe_id: Option<String>,

    /// Path of the affected file, relative to the repository root
    pub file_path: String,

    /// Line number of the finding
    #[serde(default)]
    pub line_number: u32,

    /// The offending code
    #[serde(default)]
    pub code_snippet: String,

    /// Scanner confidence in [0.0, 1.0]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.8
}

impl Vulnerability {
    /// Validate a record received from a scanner backend.
    ///
    /// Malformed backend responses are rejected at the stage boundary
    /// rather than propagated as partial records.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if self.id.trim().is_empty() {
            return Err(InvalidRecord::MissingId);
        }
        if self.file_path.trim().is_empty() {
            return Err(InvalidRecord::MissingFilePath { id: self.id.clone() });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(InvalidRecord::ConfidenceOutOfRange {
                id: self.id.clone(),
                value: self.confidence,
            });
        }
        Ok(())
    }
}

/// Severity of a vulnerability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Validation failures for backend-supplied records
#[derive(Debug, Clone, Error)]
pub enum InvalidRecord {
    #[error("vulnerability record has no id")]
    MissingId,

    #[error("vulnerability '{id}' has no file path")]
    MissingFilePath { id: String },

    #[error("vulnerability '{id}' has confidence {value} outside [0.0, 1.0]")]
    ConfidenceOutOfRange { id: String, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vulnerability {
        Vulnerability {
            id: "VULN-001".to_string(),
            title: "SQL injection in login handler".to_string(),
            description: "User input concatenated into a query".to_string(),
            severity: Severity::High,
            cwe_id: Some("CWE-89".to_string()),
            file_path: "src/auth.py".to_string(),
            line_number: 42,
            code_snippet: "query = \"SELECT * FROM users WHERE name = '\" + name + \"'\"".to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_missing_id_rejected() {
        let mut vuln = sample();
        vuln.id = "  ".to_string();
        assert!(matches!(vuln.validate(), Err(InvalidRecord::MissingId)));
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let mut vuln = sample();
        vuln.confidence = 1.5;
        assert!(matches!(
            vuln.validate(),
            Err(InvalidRecord::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");

        let parsed: Severity = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
