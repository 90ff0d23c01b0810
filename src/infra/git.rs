use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::branch::BranchName;
use crate::error::{AppError, AppResult};
use crate::services::VersionControlService;

const REMOTE: &str = "origin";

/// Version control backed by the `git` executable.
pub struct GitCli {
    workspace_root: PathBuf,
}

impl GitCli {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self { workspace_root }
    }

    /// Locates the enclosing working tree of `dir`.
    pub async fn discover(dir: &Path) -> AppResult<Self> {
        let output = run_git(Some(dir), &["rev-parse", "--show-toplevel"])
            .await
            .map_err(|err| AppError::VersionControl(format!("not in a git repository: {err}")))?;
        Ok(Self::new(PathBuf::from(output.trim())))
    }

    async fn git(&self, args: &[&str]) -> AppResult<String> {
        run_git(Some(&self.workspace_root), args).await
    }
}

async fn run_git(dir: Option<&Path>, args: &[&str]) -> AppResult<String> {
    debug!(?args, "running git");
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|err| AppError::VersionControl(format!("failed to run git: {err}")))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let detail = if !stderr.is_empty() {
        stderr
    } else if !stdout.is_empty() {
        stdout
    } else {
        format!("git {} exited with {}", args.join(" "), output.status)
    };
    Err(AppError::VersionControl(detail))
}

#[async_trait]
impl VersionControlService for GitCli {
    async fn current_branch(&self) -> AppResult<String> {
        let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = output.trim();
        if branch == "HEAD" {
            return Err(AppError::VersionControl("detached HEAD state".to_string()));
        }
        Ok(branch.to_string())
    }

    async fn is_clean(&self) -> AppResult<bool> {
        let output = self.git(&["status", "--porcelain"]).await?;
        Ok(output.trim().is_empty())
    }

    async fn create_branch(&self, branch: &BranchName) -> AppResult<()> {
        if branch.as_str().is_empty() {
            return Err(AppError::VersionControl(
                "branch name cannot be empty".to_string(),
            ));
        }
        self.git(&["checkout", "-b", branch.as_str()]).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> AppResult<()> {
        self.git(&["add", "-A"]).await?;
        self.git(&["commit", "-m", message])
            .await
            .map_err(|err| match err {
                AppError::VersionControl(detail) => {
                    AppError::VersionControl(format!("git commit failed: {detail}"))
                }
                other => other,
            })?;
        Ok(())
    }

    async fn push(&self, branch: &str) -> AppResult<()> {
        self.git(&["push", "-u", REMOTE, branch]).await?;
        Ok(())
    }

    async fn status_summary(&self) -> AppResult<String> {
        let output = self.git(&["status", "--short"]).await?;
        Ok(summarize_status(&output))
    }

    fn root(&self) -> &Path {
        &self.workspace_root
    }
}

fn summarize_status(porcelain: &str) -> String {
    let lines: Vec<String> = porcelain
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (code, path) = line.split_at(line.len().min(2));
            let code = code.trim();
            let marker = if code.contains('M') {
                "M"
            } else if code.contains('A') {
                "A"
            } else if code.contains('D') {
                "D"
            } else {
                code
            };
            format!("  {marker} {}", path.trim())
        })
        .collect();

    if lines.is_empty() {
        "  Working directory clean".to_string()
    } else {
        lines.join("\n")
    }
}
