use std::path::Path;

use async_trait::async_trait;

use crate::domain::branch::BranchName;
use crate::error::AppResult;

#[async_trait]
pub trait VersionControlService: Send + Sync {
    /// Fails on a detached HEAD.
    async fn current_branch(&self) -> AppResult<String>;
    async fn is_clean(&self) -> AppResult<bool>;
    async fn create_branch(&self, branch: &BranchName) -> AppResult<()>;
    /// Stages every change in the working tree and commits it.
    async fn commit(&self, message: &str) -> AppResult<()>;
    async fn push(&self, branch: &str) -> AppResult<()>;
    async fn status_summary(&self) -> AppResult<String>;
    fn root(&self) -> &Path;
}
