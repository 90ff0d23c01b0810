use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ticket::ReviewRequest;
use crate::error::{AppError, AppResult};
use crate::infra::jira::REQUEST_TIMEOUT;
use crate::services::CodeHostService;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab merge requests. The project is addressed by path and its numeric
/// id is looked up before every create call.
pub struct GitLabClient {
    http: Client,
    base_url: String,
    token: String,
    project_path: String,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: &str, project_path: &str) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Provider(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            project_path: project_path.trim_matches('/').to_string(),
        })
    }

    fn project_endpoint(&self) -> String {
        let encoded = utf8_percent_encode(&self.project_path, NON_ALPHANUMERIC);
        format!("{}/api/v4/projects/{encoded}", self.base_url)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> AppResult<Response> {
        let response = builder
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|err| AppError::Provider(format!("failed to call GitLab ({what}): {err}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string());
        Err(AppError::Provider(format!(
            "GitLab {what} failed with {status}: {body}"
        )))
    }

    async fn project_id(&self) -> AppResult<u64> {
        let response = self
            .send(
                self.http.get(self.project_endpoint()),
                &format!("project lookup for '{}'", self.project_path),
            )
            .await?;
        let project: ProjectResponse = response.json().await.map_err(|err| {
            AppError::Provider(format!("failed to parse GitLab project response: {err}"))
        })?;
        debug!(path = %self.project_path, id = project.id, "resolved gitlab project");
        Ok(project.id)
    }
}

#[async_trait]
impl CodeHostService for GitLabClient {
    async fn create_request(&self, request: &ReviewRequest) -> AppResult<String> {
        let project_id = self.project_id().await?;
        let body = CreateMergeRequest {
            source_branch: &request.source_branch,
            target_branch: &request.target_branch,
            title: &request.title,
            description: &request.description,
            remove_source_branch: true,
        };
        let url = format!("{}/api/v4/projects/{project_id}/merge_requests", self.base_url);
        let response = self
            .send(self.http.post(url).json(&body), "merge request creation")
            .await?;
        let payload: MergeRequestResponse = response.json().await.map_err(|err| {
            AppError::Provider(format!("failed to parse GitLab merge request response: {err}"))
        })?;
        Ok(payload.web_url)
    }

    fn request_label(&self) -> &'static str {
        "MR"
    }
}

#[derive(Serialize)]
struct CreateMergeRequest<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    description: &'a str,
    remove_source_branch: bool,
}

#[derive(Deserialize)]
struct ProjectResponse {
    id: u64,
}

#[derive(Deserialize)]
struct MergeRequestResponse {
    web_url: String,
}
