use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::CodeHostTarget;
use crate::domain::ticket::ReviewRequest;
use crate::error::{AppError, AppResult};
use crate::infra::github::{DEFAULT_API_URL, GitHubClient};
use crate::infra::gitlab::GitLabClient;
use crate::services::CodeHostService;

/// The configured code host. Chosen once from settings; callers only see
/// [`CodeHostService`].
pub enum CodeHost {
    GitHub(GitHubClient),
    GitLab(GitLabClient),
}

impl CodeHost {
    pub fn from_target(target: &CodeHostTarget) -> AppResult<Self> {
        match target {
            CodeHostTarget::GitHub {
                base_url,
                token,
                owner,
                repo,
            } => Ok(CodeHost::GitHub(GitHubClient::new(
                base_url, owner, repo, token,
            )?)),
            CodeHostTarget::GitLab {
                base_url,
                token,
                project_path,
            } => {
                let path = project_path.as_deref().ok_or_else(|| {
                    AppError::ConfigurationInvalid(
                        "GitLab project path not configured and no repository found".to_string(),
                    )
                })?;
                Ok(CodeHost::GitLab(GitLabClient::new(base_url, token, path)?))
            }
        }
    }
}

#[async_trait]
impl CodeHostService for CodeHost {
    async fn create_request(&self, request: &ReviewRequest) -> AppResult<String> {
        match self {
            CodeHost::GitHub(client) => client.create_request(request).await,
            CodeHost::GitLab(client) => client.create_request(request).await,
        }
    }

    fn request_label(&self) -> &'static str {
        match self {
            CodeHost::GitHub(client) => client.request_label(),
            CodeHost::GitLab(client) => client.request_label(),
        }
    }
}

/// Web page listing open requests whose source is `branch`.
pub fn review_list_url(target: &CodeHostTarget, branch: &str) -> String {
    let branch = utf8_percent_encode(branch, NON_ALPHANUMERIC);
    match target {
        CodeHostTarget::GitHub {
            base_url,
            owner,
            repo,
            ..
        } => {
            let api = match base_url.trim() {
                "" => DEFAULT_API_URL,
                url => url.trim_end_matches('/'),
            };
            let web = api.replacen("api.", "", 1);
            format!("{web}/{owner}/{repo}/pulls?q=is%3Apr+head%3A{branch}")
        }
        CodeHostTarget::GitLab {
            base_url,
            project_path,
            ..
        } => {
            let base = base_url.trim_end_matches('/');
            let project = project_path
                .as_deref()
                .map(|path| format!("/{}/-", path.trim_matches('/')))
                .unwrap_or_default();
            format!("{base}{project}/merge_requests?scope=all&state=opened&source_branch={branch}")
        }
    }
}
