//! Git-backed workspace using subprocess mode.
//!
//! Shells out to the `git` CLI for clone/branch/commit and to the `gh` CLI
//! for pull-request creation. One `GitWorkspace` is exclusive to one
//! pipeline run; concurrent runs get distinct workspace directories.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{PullRequest, Workspace, WorkspaceError};

/// State for a bound repository checkout
#[derive(Debug, Clone)]
struct Checkout {
    path: PathBuf,
    branch: Option<String>,
}

/// Workspace implementation backed by the git and gh CLIs
pub struct GitWorkspace {
    /// Directory under which repositories are cloned
    workspace_dir: PathBuf,

    /// The bound checkout, set by `clone_repository`
    checkout: Mutex<Option<Checkout>>,
}

impl GitWorkspace {
    /// Create a workspace rooted at `workspace_dir`
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            checkout: Mutex::new(None),
        }
    }

    /// Derive the checkout directory name from a repository URL
    /// (e.g. "https://host/org/repo.git" -> "repo")
    pub fn repo_name(repo_url: &str) -> String {
        repo_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("repo")
            .trim_end_matches(".git")
            .to_string()
    }

    async fn run_git(&self, cwd: &Path, args: &[&str]) -> Result<Output, WorkspaceError> {
        debug!(?args, cwd = %cwd.display(), "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .await?;
        Ok(output)
    }

    fn command_failure(output: &Output) -> WorkspaceError {
        WorkspaceError::Command {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    async fn bound_checkout(&self) -> Result<Checkout, WorkspaceError> {
        self.checkout
            .lock()
            .await
            .clone()
            .ok_or(WorkspaceError::State)
    }
}

#[async_trait]
impl Workspace for GitWorkspace {
    async fn clone_repository(&self, repo_url: &str) -> Result<PathBuf, WorkspaceError> {
        tokio::fs::create_dir_all(&self.workspace_dir).await?;

        let repo_path = self.workspace_dir.join(Self::repo_name(repo_url));
        info!(repo_url, path = %repo_path.display(), "cloning repository");

        let output = Command::new("git")
            .args(["clone", repo_url])
            .arg(&repo_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(WorkspaceError::Clone {
                repo_url: repo_url.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        *self.checkout.lock().await = Some(Checkout {
            path: repo_path.clone(),
            branch: None,
        });
        Ok(repo_path)
    }

    async fn create_branch(&self, name: &str) -> Result<(), WorkspaceError> {
        let checkout = self.bound_checkout().await?;

        let output = self
            .run_git(&checkout.path, &["checkout", "-b", name])
            .await?;
        if !output.status.success() {
            return Err(Self::command_failure(&output));
        }

        if let Some(ref mut bound) = *self.checkout.lock().await {
            bound.branch = Some(name.to_string());
        }
        info!(branch = name, "created remediation branch");
        Ok(())
    }

    async fn apply_fix(
        &self,
        file_path: &Path,
        original: &str,
        fixed: &str,
    ) -> Result<(), WorkspaceError> {
        let checkout = self.bound_checkout().await?;
        let target = checkout.path.join(file_path);

        let contents = tokio::fs::read_to_string(&target).await?;
        let Some(offset) = contents.find(original) else {
            return Err(WorkspaceError::PatchMismatch {
                file_path: file_path.display().to_string(),
            });
        };

        let mut patched = String::with_capacity(contents.len());
        patched.push_str(&contents[..offset]);
        patched.push_str(fixed);
        patched.push_str(&contents[offset + original.len()..]);

        tokio::fs::write(&target, patched).await?;
        info!(file = %file_path.display(), "applied fix");
        Ok(())
    }

    async fn commit(&self, message: &str, files: Option<&[PathBuf]>) -> Result<(), WorkspaceError> {
        let checkout = self.bound_checkout().await?;

        match files {
            Some(paths) => {
                for path in paths {
                    let path_str = path.display().to_string();
                    let output = self.run_git(&checkout.path, &["add", &path_str]).await?;
                    if !output.status.success() {
                        return Err(Self::command_failure(&output));
                    }
                }
            }
            None => {
                let output = self.run_git(&checkout.path, &["add", "-A"]).await?;
                if !output.status.success() {
                    return Err(Self::command_failure(&output));
                }
            }
        }

        // Nothing staged means nothing to commit
        let status = self
            .run_git(&checkout.path, &["status", "--porcelain"])
            .await?;
        if status.stdout.is_empty() {
            return Err(WorkspaceError::NoChanges);
        }

        let output = self
            .run_git(&checkout.path, &["commit", "-m", message])
            .await?;
        if !output.status.success() {
            return Err(Self::command_failure(&output));
        }

        info!("committed changes");
        Ok(())
    }

    async fn open_pull_request(
        &self,
        title: &str,
        body: &str,
    ) -> Result<PullRequest, WorkspaceError> {
        let checkout = self.bound_checkout().await?;
        let branch = checkout.branch.clone().ok_or(WorkspaceError::State)?;

        let push = self
            .run_git(&checkout.path, &["push", "--set-upstream", "origin", &branch])
            .await?;
        if !push.status.success() {
            return Err(Self::command_failure(&push));
        }

        let output = Command::new("gh")
            .args(["pr", "create", "--title", title, "--body", body])
            .current_dir(&checkout.path)
            .output()
            .await?;
        if !output.status.success() {
            return Err(WorkspaceError::Command {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // gh prints the PR URL on stdout
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let number = url
            .rsplit('/')
            .next()
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);

        info!(%url, "pull request opened");
        Ok(PullRequest {
            url,
            number,
            status: "open".to_string(),
        })
    }

    async fn cleanup(&self) {
        let mut guard = self.checkout.lock().await;
        if let Some(checkout) = guard.take() {
            if let Err(e) = tokio::fs::remove_dir_all(&checkout.path).await {
                warn!(
                    path = %checkout.path.display(),
                    error = %e,
                    "workspace cleanup failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_name_extraction() {
        assert_eq!(
            GitWorkspace::repo_name("https://github.com/org/widget.git"),
            "widget"
        );
        assert_eq!(
            GitWorkspace::repo_name("https://github.com/org/widget"),
            "widget"
        );
        assert_eq!(
            GitWorkspace::repo_name("git@github.com:org/widget.git/"),
            "widget"
        );
    }

    #[tokio::test]
    async fn test_operations_require_bound_repository() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = GitWorkspace::new(temp.path());

        let branch = workspace.create_branch("fixes").await;
        assert!(matches!(branch, Err(WorkspaceError::State)));

        let commit = workspace.commit("msg", None).await;
        assert!(matches!(commit, Err(WorkspaceError::State)));

        let pr = workspace.open_pull_request("t", "b").await;
        assert!(matches!(pr, Err(WorkspaceError::State)));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = GitWorkspace::new(temp.path());

        // Never raises, even with nothing cloned
        workspace.cleanup().await;
        workspace.cleanup().await;
    }
}
