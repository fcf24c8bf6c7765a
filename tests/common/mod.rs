//! Stub backends and workspace for pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use aegis::backends::{BackendError, Fixer, ParseOutcome, Researcher, Reviewer, Scanner};
use aegis::domain::{Fix, Research, ReviewStatus, ReviewVerdict, Severity, Vulnerability};
use aegis::workspace::{PullRequest, Workspace, WorkspaceError};

pub fn vuln(id: &str, severity: Severity) -> Vulnerability {
    Vulnerability {
        id: id.to_string(),
        title: format!("finding {id}"),
        description: "test finding".to_string(),
        severity,
        cwe_id: None,
        file_path: format!("src/{id}.py"),
        line_number: 10,
        code_snippet: format!("vulnerable_{id}()"),
        confidence: 0.9,
    }
}

/// Scanner stub returning a fixed set of findings
#[derive(Default)]
pub struct StubScanner {
    pub vulnerabilities: Vec<Vulnerability>,
    pub fail: bool,
    pub calls: AtomicU32,
}

impl StubScanner {
    pub fn returning(vulnerabilities: Vec<Vulnerability>) -> Self {
        Self {
            vulnerabilities,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scanner for StubScanner {
    async fn scan(&self, _repo_path: &Path) -> Result<Vec<Vulnerability>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BackendError::Malformed("scanner stub failure".to_string()));
        }
        Ok(self.vulnerabilities.clone())
    }
}

/// Researcher stub; can fail for one vulnerability id or return a
/// mismatched id mapping
#[derive(Default)]
pub struct StubResearcher {
    pub fail_for: Option<String>,
    pub wrong_id_for: Option<String>,
    pub calls: AtomicU32,
}

impl StubResearcher {
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Researcher for StubResearcher {
    async fn research(&self, vulnerability: &Vulnerability) -> Result<Research, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.as_deref() == Some(&vulnerability.id) {
            return Err(BackendError::Malformed(format!(
                "researcher stub failure for {}",
                vulnerability.id
            )));
        }
        let id = if self.wrong_id_for.as_deref() == Some(&vulnerability.id) {
            "SOMETHING-ELSE".to_string()
        } else {
            vulnerability.id.clone()
        };
        Ok(Research::new(
            id,
            format!("analysis for {}", vulnerability.id),
            "use the safe API",
        ))
    }
}

/// Fixer stub; returns a well-formed fix unless told to fail or return
/// unparseable output for specific ids
#[derive(Default)]
pub struct StubFixer {
    pub unparseable_for: Vec<String>,
    pub fail_for: Vec<String>,
    pub calls: AtomicU32,
}

impl StubFixer {
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fixer for StubFixer {
    async fn propose_fix(
        &self,
        vulnerability: &Vulnerability,
        _research: &Research,
    ) -> Result<ParseOutcome<Fix>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.contains(&vulnerability.id) {
            return Err(BackendError::Malformed(format!(
                "fixer stub failure for {}",
                vulnerability.id
            )));
        }
        if self.unparseable_for.contains(&vulnerability.id) {
            return Ok(ParseOutcome::Unparseable {
                raw: "I'm sorry, I cannot produce a fix".to_string(),
            });
        }
        Ok(ParseOutcome::Parsed(Fix {
            vulnerability_id: vulnerability.id.clone(),
            file_path: vulnerability.file_path.clone(),
            original_code: vulnerability.code_snippet.clone(),
            fixed_code: format!("fixed_{}()", vulnerability.id),
            explanation: format!("replaced the unsafe call in {}", vulnerability.id),
            confidence: 0.85,
            review_status: ReviewStatus::Pending,
            review_comments: None,
            security_score: None,
            parse_failed: false,
        }))
    }
}

/// Reviewer stub; approves the listed vulnerability ids, marks the rest
/// NEEDS_REVISION, and can fail outright for specific ids
#[derive(Default)]
pub struct StubReviewer {
    pub approve: Vec<String>,
    pub fail_for: Vec<String>,
    pub unparseable_for: Vec<String>,
    pub calls: AtomicU32,
}

impl StubReviewer {
    pub fn approving(ids: &[&str]) -> Self {
        Self {
            approve: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reviewer for StubReviewer {
    async fn review(&self, fix: &Fix) -> Result<ParseOutcome<ReviewVerdict>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.contains(&fix.vulnerability_id) {
            return Err(BackendError::Malformed(format!(
                "reviewer stub failure for {}",
                fix.vulnerability_id
            )));
        }
        if self.unparseable_for.contains(&fix.vulnerability_id) {
            return Ok(ParseOutcome::Unparseable {
                raw: "ambiguous review prose".to_string(),
            });
        }
        if self.approve.contains(&fix.vulnerability_id) {
            Ok(ParseOutcome::Parsed(ReviewVerdict {
                status: ReviewStatus::Approved,
                comments: "eliminates the vulnerability".to_string(),
                score: 92,
            }))
        } else {
            Ok(ParseOutcome::Parsed(ReviewVerdict {
                status: ReviewStatus::NeedsRevision,
                comments: "needs another pass".to_string(),
                score: 45,
            }))
        }
    }
}

/// In-memory workspace that records every call
#[derive(Default)]
pub struct RecordingWorkspace {
    pub fail_clone: bool,
    pub fail_commit: bool,
    pub calls: Mutex<Vec<String>>,
    pub last_pr_body: Mutex<Option<String>>,
}

impl RecordingWorkspace {
    pub fn recorded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Workspace for RecordingWorkspace {
    async fn clone_repository(&self, repo_url: &str) -> Result<PathBuf, WorkspaceError> {
        self.record("clone");
        if self.fail_clone {
            return Err(WorkspaceError::Clone {
                repo_url: repo_url.to_string(),
                message: "repository not found".to_string(),
            });
        }
        Ok(PathBuf::from("/workspace/repo"))
    }

    async fn create_branch(&self, name: &str) -> Result<(), WorkspaceError> {
        self.record(format!("branch:{name}"));
        Ok(())
    }

    async fn apply_fix(
        &self,
        file_path: &Path,
        _original: &str,
        _fixed: &str,
    ) -> Result<(), WorkspaceError> {
        self.record(format!("apply:{}", file_path.display()));
        Ok(())
    }

    async fn commit(&self, _message: &str, _files: Option<&[PathBuf]>) -> Result<(), WorkspaceError> {
        self.record("commit");
        if self.fail_commit {
            return Err(WorkspaceError::Command {
                message: "remote rejected the commit".to_string(),
            });
        }
        Ok(())
    }

    async fn open_pull_request(
        &self,
        _title: &str,
        body: &str,
    ) -> Result<PullRequest, WorkspaceError> {
        self.record("pull_request");
        *self.last_pr_body.lock().unwrap() = Some(body.to_string());
        Ok(PullRequest {
            url: "https://example.com/org/repo/pull/7".to_string(),
            number: 7,
            status: "open".to_string(),
        })
    }

    async fn cleanup(&self) {
        self.record("cleanup");
    }
}
