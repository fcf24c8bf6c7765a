//! Pipeline orchestrator for automated security remediation.
//!
//! A finite-state machine over the stages
//! INITIALIZE -> SCAN -> RESEARCH -> GENERATE_FIXES -> REVIEW -> PUBLISH
//! -> COMPLETE, with terminal ERROR reachable from every non-terminal
//! stage. The orchestrator owns the pipeline state, invokes the stage
//! backends, applies the branching rules, and converts every failure into
//! the ERROR stage instead of raising. Workspace cleanup runs exactly
//! once per run, on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::backends::{Fixer, OllamaBackend, ParseOutcome, Researcher, Reviewer, Scanner};
use crate::config::Config;
use crate::domain::{Fix, ReviewStatus, ReviewVerdict, RunResult};
use crate::workspace::{GitWorkspace, Workspace};

use super::error::PipelineError;
use super::state::{PipelineState, Stage};

/// Orchestrates one security-remediation run end to end
pub struct Orchestrator {
    scanner: Arc<dyn Scanner>,
    researcher: Arc<dyn Researcher>,
    fixer: Arc<dyn Fixer>,
    reviewer: Arc<dyn Reviewer>,
    workspace: Arc<dyn Workspace>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator over explicit backends and workspace
    pub fn new(
        scanner: Arc<dyn Scanner>,
        researcher: Arc<dyn Researcher>,
        fixer: Arc<dyn Fixer>,
        reviewer: Arc<dyn Reviewer>,
        workspace: Arc<dyn Workspace>,
    ) -> Self {
        Self {
            scanner,
            researcher,
            fixer,
            reviewer,
            workspace,
            cancel: CancellationToken::new(),
        }
    }

    /// Build an orchestrator from resolved configuration: the Ollama
    /// backend serves all four roles and a git workspace handles the
    /// repository.
    pub fn from_config(config: &Config) -> Self {
        let backend = Arc::new(OllamaBackend::from_config(&config.ollama));
        let workspace = Arc::new(GitWorkspace::new(config.workspace_dir.clone()));
        Self::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend,
            workspace,
        )
    }

    /// Replace the cancellation token (e.g. to share one across runs)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle callers can use to cancel the run. Cancellation is
    /// observed at stage boundaries, not mid-backend-call.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline for a repository. Always returns a report; raw
    /// backend errors never escape.
    #[instrument(skip(self))]
    pub async fn run(&self, repo_url: &str) -> RunResult {
        let state = self.execute(repo_url).await;
        RunResult::from_state(&state)
    }

    /// Run the pipeline and return the full final state, including
    /// partial results when the run ends in ERROR.
    pub async fn execute(&self, repo_url: &str) -> PipelineState {
        let mut state = PipelineState::new(repo_url);
        info!(run_id = %state.run_id, repo_url, "starting remediation run");

        while !state.stage.is_terminal() {
            // Stage boundary: the only place cancellation is observed
            if self.cancel.is_cancelled() {
                warn!(stage = %state.stage, "run cancelled");
                state.fail(PipelineError::Cancelled);
                break;
            }

            info!(stage = %state.stage, "entering stage");
            let result = match state.stage {
                Stage::Initialize => self.initialize(&mut state).await,
                Stage::Scan => self.scan(&mut state).await,
                Stage::Research => self.research(&mut state).await,
                Stage::GenerateFixes => self.generate_fixes(&mut state).await,
                Stage::Review => self.review(&mut state).await,
                Stage::Publish => self.publish(&mut state).await,
                Stage::Complete | Stage::Error => Ok(()),
            };

            match result {
                Ok(()) => state.advance(),
                Err(e) => {
                    error!(stage = %state.stage, error = %e, "stage failed");
                    state.fail(e);
                }
            }
        }

        // Teardown runs once per run, on every exit path; failures are
        // logged by the workspace, never raised
        self.workspace.cleanup().await;

        info!(
            run_id = %state.run_id,
            stage = %state.stage,
            vulnerabilities = state.vulnerabilities.len(),
            approved = state.approved_fixes().len(),
            "run finished"
        );
        state
    }

    /// INITIALIZE: acquire the workspace (clone + remediation branch)
    async fn initialize(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let repo_path = self
            .workspace
            .clone_repository(&state.repo_url)
            .await
            .map_err(PipelineError::Setup)?;

        let branch_name = format!("aegis/security-fixes-{}", short_id(state));
        self.workspace
            .create_branch(&branch_name)
            .await
            .map_err(PipelineError::Setup)?;

        state.repo_path = Some(repo_path);
        state.branch_name = Some(branch_name);
        Ok(())
    }

    /// SCAN: discover vulnerabilities. Zero findings is a valid outcome.
    async fn scan(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let repo_path = state.repo_path.clone().unwrap_or_else(|| PathBuf::from("."));

        let vulnerabilities = self
            .scanner
            .scan(&repo_path)
            .await
            .map_err(|source| PipelineError::Backend {
                stage: Stage::Scan,
                source,
            })?;

        // Reject malformed records at the stage boundary
        for vuln in &vulnerabilities {
            vuln.validate().map_err(|e| PipelineError::Backend {
                stage: Stage::Scan,
                source: e.into(),
            })?;
        }

        info!(count = vulnerabilities.len(), "scan finished");
        state.vulnerabilities = vulnerabilities;
        Ok(())
    }

    /// RESEARCH: one backend call per vulnerability, in scan order.
    ///
    /// Results already gathered stay in the state when a later call
    /// fails, so an ERROR run still reports its partial research.
    async fn research(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        for vuln in state.vulnerabilities.clone() {
            let research = self
                .researcher
                .research(&vuln)
                .await
                .map_err(|source| PipelineError::Backend {
                    stage: Stage::Research,
                    source,
                })?;

            // A result that cannot be associated back to its
            // vulnerability is rejected, not silently dropped
            if research.vulnerability_id != vuln.id {
                return Err(PipelineError::Backend {
                    stage: Stage::Research,
                    source: crate::backends::BackendError::Malformed(format!(
                        "research for '{}' carries id '{}'",
                        vuln.id, research.vulnerability_id
                    )),
                });
            }

            state.research.insert(vuln.id.clone(), research);
        }

        state.check_invariants()?;
        info!(count = state.research.len(), "research finished");
        Ok(())
    }

    /// GENERATE_FIXES: one fixer call per researched vulnerability.
    ///
    /// Unusable results degrade that single fix to NEEDS_REVISION; the
    /// run proceeds.
    async fn generate_fixes(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let mut fixes = Vec::new();

        for vuln in &state.vulnerabilities {
            let Some(research) = state.research.get(&vuln.id) else {
                debug!(id = %vuln.id, "no research entry, skipping fix generation");
                continue;
            };

            let fix = match self.fixer.propose_fix(vuln, research).await {
                Ok(ParseOutcome::Parsed(mut fix)) => {
                    // The fixer owns the code fields but not the association
                    fix.vulnerability_id = vuln.id.clone();
                    fix
                }
                Ok(ParseOutcome::Unparseable { .. }) => {
                    warn!(id = %vuln.id, "fixer response could not be parsed, degrading fix");
                    Fix::degraded(vuln, "fixer response could not be parsed", true)
                }
                Err(e) => {
                    warn!(id = %vuln.id, error = %e, "fixer backend failed, degrading fix");
                    Fix::degraded(vuln, format!("fixer backend failed: {e}"), false)
                }
            };
            fixes.push(fix);
        }

        state.fixes = fixes;
        state.check_invariants()?;
        info!(count = state.fixes.len(), "fix generation finished");
        Ok(())
    }

    /// REVIEW: one reviewer call per pending fix. A failed or unparseable
    /// review defaults that fix to NEEDS_REVISION, never drops it.
    async fn review(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        for fix in &mut state.fixes {
            if fix.review_status != ReviewStatus::Pending {
                // Already degraded during generation
                continue;
            }

            let verdict = match self.reviewer.review(fix).await {
                Ok(ParseOutcome::Parsed(verdict)) => verdict,
                Ok(ParseOutcome::Unparseable { .. }) => {
                    warn!(id = %fix.vulnerability_id, "review response could not be parsed");
                    ReviewVerdict {
                        status: ReviewStatus::NeedsRevision,
                        comments: "review response could not be parsed".to_string(),
                        score: 0,
                    }
                }
                Err(e) => {
                    warn!(id = %fix.vulnerability_id, error = %e, "reviewer backend failed");
                    ReviewVerdict {
                        status: ReviewStatus::NeedsRevision,
                        comments: format!("reviewer backend failed: {e}"),
                        score: 0,
                    }
                }
            };
            fix.resolve_review(verdict);
        }

        let approved = state.fixes.iter().filter(|f| f.is_approved()).count();
        info!(approved, total = state.fixes.len(), "review finished");
        Ok(())
    }

    /// PUBLISH: apply approved fixes, commit once, open the pull request.
    async fn publish(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let approved: Vec<Fix> = state
            .approved_fixes()
            .into_iter()
            .cloned()
            .collect();
        let publish_error = |source| PipelineError::Publish {
            approved_fixes: approved.len(),
            source,
        };

        for fix in &approved {
            self.workspace
                .apply_fix(Path::new(&fix.file_path), &fix.original_code, &fix.fixed_code)
                .await
                .map_err(publish_error)?;
        }

        let message = format!(
            "Security fixes: resolved {} vulnerabilities",
            approved.len()
        );
        self.workspace
            .commit(&message, None)
            .await
            .map_err(publish_error)?;

        let pr = self
            .workspace
            .open_pull_request(
                "Automated security vulnerability fixes",
                &pr_description(&approved),
            )
            .await
            .map_err(publish_error)?;

        state.summary = Some(run_summary(state, approved.len(), &pr.url));
        state.pull_request = Some(pr);
        Ok(())
    }
}

fn short_id(state: &PipelineState) -> String {
    state.run_id.simple().to_string()[..8].to_string()
}

/// Pull-request body listing every approved fix's id and explanation
fn pr_description(approved: &[Fix]) -> String {
    let mut body = String::from("## Automated Security Vulnerability Fixes\n\n");
    body.push_str(&format!(
        "This PR addresses {} security vulnerabilities found in the codebase.\n\n",
        approved.len()
    ));
    body.push_str("### Vulnerabilities fixed\n");
    for fix in approved {
        let explanation: String = fix.explanation.chars().take(100).collect();
        body.push_str(&format!("- **{}**: {}\n", fix.vulnerability_id, explanation));
    }
    body.push_str(
        "\n### Review\nEach fix passed automated security review before inclusion. \
         Please verify that functionality remains intact.\n",
    );
    body
}

/// Summary report for a published run
fn run_summary(state: &PipelineState, fixes_applied: usize, pr_url: &str) -> String {
    format!(
        "# Security Remediation Summary\n\n\
         Repository: {}\n\
         Vulnerabilities found: {}\n\
         Fixes applied: {}\n\
         Pull request: {}\n",
        state.repo_url,
        state.vulnerabilities.len(),
        fixes_applied,
        pr_url
    )
}
