//! Parsing of model responses into pipeline records.
//!
//! Models wrap JSON in prose or code fences more often than not, so every
//! parser first extracts the JSON payload, then deserializes, then
//! validates. Parsers that feed the degrade-not-abort stages return a
//! `ParseOutcome` instead of an error: the raw text is preserved so the
//! degraded record can carry it forward for a human.

use serde::Deserialize;

use crate::domain::{Fix, Research, ReviewStatus, ReviewVerdict, Vulnerability};

use super::BackendError;

/// Result of parsing one model response
#[derive(Debug, Clone)]
pub enum ParseOutcome<T> {
    /// The response parsed into a well-formed record
    Parsed(T),

    /// The response could not be parsed; the raw text is kept
    Unparseable { raw: String },
}

impl<T> ParseOutcome<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

/// Extract the JSON payload from a model response.
///
/// Handles plain JSON, fenced ```json blocks, and JSON embedded in
/// surrounding prose (first `{` or `[` to the matching close).
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();

    // Fenced block first, but only when it actually wraps JSON; a fence
    // holding fixed code must not shadow JSON elsewhere in the prose
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let fenced = body[..end].trim();
            if fenced.starts_with(['{', '[']) {
                return Some(fenced);
            }
        }
    }

    // Otherwise scan for the outermost object or array
    let open = trimmed.find(['{', '['])?;
    let open_char = trimmed.as_bytes()[open] as char;
    let close_char = if open_char == '{' { '}' } else { ']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in trimmed[open..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open_char => depth += 1,
            c if c == close_char => {
                depth -= 1;
                if depth == 0 {
                    return Some(&trimmed[open..=open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Wire shape of a scanner response
#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    vulnerabilities: Vec<Vulnerability>,
}

/// Parse a scanner response into validated vulnerability records.
///
/// Scan output is a prerequisite for every later stage, so a malformed
/// response here is unrecoverable and rejected outright.
pub fn parse_vulnerabilities(raw: &str) -> Result<Vec<Vulnerability>, BackendError> {
    let payload = extract_json(raw)
        .ok_or_else(|| BackendError::Malformed("scanner response contains no JSON".to_string()))?;

    // Accept both {"vulnerabilities": [...]} and a bare array
    let vulnerabilities = if payload.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Vulnerability>>(payload)
            .map_err(|e| BackendError::Malformed(format!("scanner response: {e}")))?
    } else {
        serde_json::from_str::<ScanResponse>(payload)
            .map_err(|e| BackendError::Malformed(format!("scanner response: {e}")))?
            .vulnerabilities
    };

    for vuln in &vulnerabilities {
        vuln.validate()?;
    }
    Ok(vulnerabilities)
}

/// Wire shape of a researcher response
#[derive(Debug, Deserialize)]
struct ResearchResponse {
    analysis: String,
    #[serde(default)]
    recommendation: String,
}

/// Parse a researcher response.
///
/// Falls back to treating the whole response as free-form analysis when
/// it is not JSON; research text is consumed by the fixer prompt, not
/// machine-interpreted, so prose is acceptable.
pub fn parse_research(raw: &str, vulnerability_id: &str) -> Research {
    if let Some(payload) = extract_json(raw) {
        if let Ok(parsed) = serde_json::from_str::<ResearchResponse>(payload) {
            return Research::new(vulnerability_id, parsed.analysis, parsed.recommendation);
        }
    }
    Research::new(vulnerability_id, raw.trim(), "")
}

/// Wire shape of a fixer response
#[derive(Debug, Deserialize)]
struct FixResponse {
    fixed_code: String,
    #[serde(default)]
    explanation: String,
    #[serde(default = "default_fix_confidence")]
    confidence: f64,
}

fn default_fix_confidence() -> f64 {
    0.8
}

/// Parse a fixer response into a Fix with `review_status` PENDING.
pub fn parse_fix(raw: &str, vulnerability: &Vulnerability) -> ParseOutcome<Fix> {
    let Some(payload) = extract_json(raw) else {
        return ParseOutcome::Unparseable { raw: raw.to_string() };
    };
    let Ok(parsed) = serde_json::from_str::<FixResponse>(payload) else {
        return ParseOutcome::Unparseable { raw: raw.to_string() };
    };
    if parsed.fixed_code.trim().is_empty() {
        return ParseOutcome::Unparseable { raw: raw.to_string() };
    }

    ParseOutcome::Parsed(Fix {
        vulnerability_id: vulnerability.id.clone(),
        file_path: vulnerability.file_path.clone(),
        original_code: vulnerability.code_snippet.clone(),
        fixed_code: parsed.fixed_code,
        explanation: parsed.explanation,
        confidence: parsed.confidence.clamp(0.0, 1.0),
        review_status: ReviewStatus::Pending,
        review_comments: None,
        security_score: None,
        parse_failed: false,
    })
}

/// Wire shape of a reviewer response
#[derive(Debug, Deserialize)]
struct ReviewResponse {
    status: ReviewStatus,
    #[serde(default)]
    comments: String,
    #[serde(default)]
    score: u8,
}

/// Parse a reviewer response into a verdict.
pub fn parse_review(raw: &str) -> ParseOutcome<ReviewVerdict> {
    let Some(payload) = extract_json(raw) else {
        return ParseOutcome::Unparseable { raw: raw.to_string() };
    };
    let Ok(parsed) = serde_json::from_str::<ReviewResponse>(payload) else {
        return ParseOutcome::Unparseable { raw: raw.to_string() };
    };
    // A reviewer must resolve the status; PENDING is not a verdict
    if parsed.status == ReviewStatus::Pending {
        return ParseOutcome::Unparseable { raw: raw.to_string() };
    }

    ParseOutcome::Parsed(ReviewVerdict {
        status: parsed.status,
        comments: parsed.comments,
        score: parsed.score.min(100),
    })
}
