use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{AuthMethod, JiraSettings};
use crate::domain::ticket::{Ticket, Transition};
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SEARCH_FIELDS: [&str; 4] = ["summary", "status", "assignee", "description"];

/// Characters a ticket key may keep verbatim inside a path segment.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

pub struct JiraClient {
    http: Client,
    base_url: String,
    api_version: String,
    authorization: String,
}

impl JiraClient {
    pub fn new(
        base_url: &str,
        email: &str,
        auth: &AuthMethod,
        api_version: &str,
    ) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::IssueTracker(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            authorization: Self::auth_header(email, auth),
        })
    }

    pub fn from_settings(settings: &JiraSettings) -> AppResult<Self> {
        Self::new(
            &settings.url,
            &settings.email,
            &settings.auth_method,
            settings.api_version(),
        )
    }

    fn auth_header(email: &str, auth: &AuthMethod) -> String {
        match auth {
            AuthMethod::PersonalAccessToken { token } => format!("Bearer {token}"),
            AuthMethod::ApiToken { token } => {
                let credentials = format!("{email}:{token}");
                let encoded = BASE64_STANDARD.encode(credentials);
                format!("Basic {encoded}")
            }
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/api/{}/{}", self.base_url, self.api_version, path)
    }

    fn issue_path(key: &str) -> String {
        format!("issue/{}", utf8_percent_encode(key.trim(), KEY_SEGMENT))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, &self.authorization)
            .header(ACCEPT, "application/json")
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> AppResult<Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call Jira: {err}")))?;

        let status = response.status();
        debug!(%status, what, "jira response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::IssueTracker(format!(
                "Jira authentication failed ({status}); check your token"
            )),
            StatusCode::NOT_FOUND => AppError::IssueTracker(format!("{what} not found")),
            _ => AppError::IssueTracker(format!("Jira responded with {status}: {body}")),
        })
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> AppResult<T> {
        response
            .json()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to parse Jira response: {err}")))
    }
}

#[async_trait]
impl IssueTrackerService for JiraClient {
    async fn get_ticket(&self, key: &str) -> AppResult<Ticket> {
        let url = self.endpoint(&Self::issue_path(key));
        let response = self
            .send(self.http.get(url), &format!("ticket '{key}'"))
            .await?;
        let issue: JiraIssue = Self::parse(response).await?;
        Ok(issue.into_ticket())
    }

    async fn list_transitions(&self, key: &str) -> AppResult<Vec<Transition>> {
        let url = self.endpoint(&format!("{}/transitions", Self::issue_path(key)));
        let response = self
            .send(self.http.get(url), &format!("ticket '{key}'"))
            .await?;
        let payload: JiraTransitions = Self::parse(response).await?;
        Ok(payload
            .transitions
            .into_iter()
            .map(|t| Transition {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn apply_transition(&self, key: &str, transition_id: &str) -> AppResult<()> {
        let url = self.endpoint(&format!("{}/transitions", Self::issue_path(key)));
        let body = JiraTransitionRequest {
            transition: JiraTransitionId {
                id: transition_id.to_string(),
            },
        };
        self.send(self.http.post(url).json(&body), &format!("ticket '{key}'"))
            .await?;
        Ok(())
    }

    async fn search(&self, jql: &str, limit: usize) -> AppResult<Vec<Ticket>> {
        debug!(jql, limit, "searching jira");
        let body = JiraSearchRequest {
            jql,
            fields: &SEARCH_FIELDS,
            max_results: limit,
        };
        let response = self
            .send(self.http.post(self.endpoint("search")).json(&body), "search")
            .await?;
        let payload: JiraSearchResponse = Self::parse(response).await?;
        Ok(payload
            .issues
            .into_iter()
            .map(JiraIssue::into_ticket)
            .collect())
    }

    async fn test_connection(&self) -> AppResult<()> {
        self.send(self.http.get(self.endpoint("myself")), "current user")
            .await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JiraTransitionRequest {
    transition: JiraTransitionId,
}

#[derive(Serialize)]
struct JiraTransitionId {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JiraSearchRequest<'a> {
    jql: &'a str,
    fields: &'a [&'a str],
    max_results: usize,
}

#[derive(Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraTransitions {
    #[serde(default)]
    transitions: Vec<JiraTransition>,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraIssueFields,
}

#[derive(Deserialize)]
struct JiraIssueFields {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    status: Option<JiraStatus>,
    #[serde(default)]
    assignee: Option<JiraUser>,
}

#[derive(Deserialize)]
struct JiraStatus {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    display_name: String,
}

impl JiraIssue {
    fn into_ticket(self) -> Ticket {
        let fields = self.fields;
        Ticket {
            key: self.key,
            summary: fields.summary,
            description: fields
                .description
                .as_ref()
                .map(description_text)
                .filter(|text| !text.is_empty()),
            status: fields.status.map(|s| s.name).unwrap_or_default(),
            assignee: fields.assignee.map(|user| user.display_name),
        }
    }
}

/// Flattens a description into plain text. API v2 returns a string, v3 an
/// Atlassian document whose paragraphs hold `text` nodes.
fn description_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Object(_) => {
            let mut paragraphs = Vec::new();
            collect_paragraphs(value, &mut paragraphs);
            paragraphs.join("\n\n")
        }
        _ => String::new(),
    }
}

fn collect_paragraphs(node: &Value, out: &mut Vec<String>) {
    let children = node.get("content").and_then(Value::as_array);
    let is_block = children.is_some_and(|nodes| {
        nodes
            .iter()
            .any(|child| child.get("type").and_then(Value::as_str) == Some("text"))
    });

    if is_block {
        let mut text = String::new();
        collect_text(node, &mut text);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        return;
    }

    for child in children.into_iter().flatten() {
        collect_paragraphs(child, out);
    }
}

fn collect_text(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    for child in node
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        collect_text(child, out);
    }
}
