use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ticket::ReviewRequest;
use crate::error::{AppError, AppResult};
use crate::infra::jira::REQUEST_TIMEOUT;
use crate::services::CodeHostService;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub struct GitHubClient {
    http: Client,
    base_url: String,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, owner: &str, repo: &str, token: &str) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Provider(format!("failed to build HTTP client: {err}")))?;
        let base_url = match base_url.trim() {
            "" => DEFAULT_API_URL,
            url => url.trim_end_matches('/'),
        };
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        })
    }

    fn pulls_endpoint(&self) -> String {
        format!("{}/repos/{}/{}/pulls", self.base_url, self.owner, self.repo)
    }
}

#[async_trait]
impl CodeHostService for GitHubClient {
    async fn create_request(&self, request: &ReviewRequest) -> AppResult<String> {
        let body = CreatePullRequest {
            title: &request.title,
            body: &request.description,
            head: &request.source_branch,
            base: &request.target_branch,
        };
        debug!(owner = %self.owner, repo = %self.repo, head = %request.source_branch, "creating pull request");

        let response = self
            .http
            .post(self.pulls_endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "devflow-cli")
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Provider(format!("failed to call GitHub: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::Provider(format!(
                "GitHub responded with {status}: {body}"
            )));
        }

        let payload: PullRequestResponse = response
            .json()
            .await
            .map_err(|err| AppError::Provider(format!("failed to parse GitHub response: {err}")))?;
        Ok(payload.html_url)
    }

    fn request_label(&self) -> &'static str {
        "PR"
    }
}

#[derive(Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    html_url: String,
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    fn request() -> ReviewRequest {
        ReviewRequest {
            source_branch: "feat/WAB-1/add_login".to_string(),
            target_branch: "main".to_string(),
            title: "WAB-1: Add login".to_string(),
            description: "Resolves WAB-1".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_pull_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/acme/widgets/pulls")
            .match_header("authorization", "Bearer ghp_token")
            .match_header("accept", "application/vnd.github+json")
            .match_header("user-agent", "devflow-cli")
            .match_body(Matcher::Json(json!({
                "title": "WAB-1: Add login",
                "body": "Resolves WAB-1",
                "head": "feat/WAB-1/add_login",
                "base": "main"
            })))
            .with_status(201)
            .with_body(json!({ "html_url": "https://github.com/acme/widgets/pull/7" }).to_string())
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), "acme", "widgets", "ghp_token").unwrap();
        let url = client.create_request(&request()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(url, "https://github.com/acme/widgets/pull/7");
        assert_eq!(client.request_label(), "PR");
    }

    #[tokio::test]
    async fn surfaces_api_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/repos/acme/widgets/pulls")
            .with_status(422)
            .with_body("{\"message\":\"A pull request already exists\"}")
            .create_async()
            .await;

        let client = GitHubClient::new(&server.url(), "acme", "widgets", "t").unwrap();
        match client.create_request(&request()).await {
            Err(AppError::Provider(message)) => assert!(message.contains("already exists")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_public_api() {
        let client = GitHubClient::new("", "acme", "widgets", "t").unwrap();
        assert_eq!(
            client.pulls_endpoint(),
            "https://api.github.com/repos/acme/widgets/pulls"
        );
    }
}
