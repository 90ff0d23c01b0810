//! In-memory gateways for workflow tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{ProviderKind, Settings, sample_settings};
use crate::context::AppContext;
use crate::domain::branch::BranchName;
use crate::domain::ticket::{ReviewRequest, Ticket, Transition};
use crate::error::{AppError, AppResult};
use crate::services::{CodeHostService, IssueTrackerService, VersionControlService};

pub fn ticket(key: &str, summary: &str) -> Ticket {
    Ticket {
        key: key.to_string(),
        summary: summary.to_string(),
        description: None,
        status: "To Do".to_string(),
        assignee: None,
    }
}

#[derive(Default)]
pub struct FakeTracker {
    pub tickets: Mutex<HashMap<String, Ticket>>,
    pub transition_names: Vec<String>,
    pub fail_transitions: bool,
    pub applied: Mutex<Vec<String>>,
    pub fetches: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<(String, usize)>>,
}

impl FakeTracker {
    pub fn with_ticket(ticket: Ticket) -> Self {
        let tracker = Self {
            transition_names: vec!["In Progress".to_string(), "In Review".to_string()],
            ..Self::default()
        };
        tracker.add(ticket);
        tracker
    }

    pub fn add(&self, ticket: Ticket) {
        self.tickets
            .lock()
            .unwrap()
            .insert(ticket.key.clone(), ticket);
    }

    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl IssueTrackerService for FakeTracker {
    async fn get_ticket(&self, key: &str) -> AppResult<Ticket> {
        self.fetches.lock().unwrap().push(key.to_string());
        self.tickets
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::IssueTracker(format!("ticket '{key}' not found")))
    }

    async fn list_transitions(&self, _key: &str) -> AppResult<Vec<Transition>> {
        if self.fail_transitions {
            return Err(AppError::IssueTracker("transitions unavailable".to_string()));
        }
        Ok(self
            .transition_names
            .iter()
            .enumerate()
            .map(|(index, name)| Transition {
                id: (index + 1).to_string(),
                name: name.clone(),
            })
            .collect())
    }

    async fn apply_transition(&self, _key: &str, transition_id: &str) -> AppResult<()> {
        let name = transition_id
            .parse::<usize>()
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| self.transition_names.get(index))
            .cloned()
            .ok_or_else(|| AppError::IssueTracker(format!("bad transition {transition_id}")))?;
        self.applied.lock().unwrap().push(name);
        Ok(())
    }

    async fn search(&self, jql: &str, limit: usize) -> AppResult<Vec<Ticket>> {
        self.searches
            .lock()
            .unwrap()
            .push((jql.to_string(), limit));
        let mut tickets: Vec<Ticket> = self.tickets.lock().unwrap().values().cloned().collect();
        tickets.sort_by(|a, b| a.key.cmp(&b.key));
        tickets.truncate(limit);
        Ok(tickets)
    }

    async fn test_connection(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct FakeGit {
    pub root: PathBuf,
    pub branch: Mutex<Option<String>>,
    pub branches: Mutex<Vec<String>>,
    pub dirty: Mutex<bool>,
    pub commits: Mutex<Vec<String>>,
    pub pushes: Mutex<Vec<String>>,
    pub fail_push: bool,
}

impl FakeGit {
    pub fn on_branch(branch: &str) -> Self {
        Self {
            root: PathBuf::from("/work/widgets"),
            branch: Mutex::new(Some(branch.to_string())),
            branches: Mutex::new(vec![branch.to_string()]),
            dirty: Mutex::new(false),
            commits: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            fail_push: false,
        }
    }

    pub fn make_dirty(&self) {
        *self.dirty.lock().unwrap() = true;
    }

    pub fn current(&self) -> Option<String> {
        self.branch.lock().unwrap().clone()
    }

    /// Count of calls that changed repository state.
    pub fn mutation_count(&self) -> usize {
        self.branches.lock().unwrap().len() - 1
            + self.commits.lock().unwrap().len()
            + self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl VersionControlService for FakeGit {
    async fn current_branch(&self) -> AppResult<String> {
        self.current()
            .ok_or_else(|| AppError::VersionControl("detached HEAD state".to_string()))
    }

    async fn is_clean(&self) -> AppResult<bool> {
        Ok(!*self.dirty.lock().unwrap())
    }

    async fn create_branch(&self, branch: &BranchName) -> AppResult<()> {
        let mut branches = self.branches.lock().unwrap();
        if branches.iter().any(|existing| existing == branch.as_str()) {
            return Err(AppError::VersionControl(format!(
                "a branch named '{branch}' already exists"
            )));
        }
        branches.push(branch.to_string());
        *self.branch.lock().unwrap() = Some(branch.to_string());
        Ok(())
    }

    async fn commit(&self, message: &str) -> AppResult<()> {
        self.commits.lock().unwrap().push(message.to_string());
        *self.dirty.lock().unwrap() = false;
        Ok(())
    }

    async fn push(&self, branch: &str) -> AppResult<()> {
        if self.fail_push {
            return Err(AppError::VersionControl("remote rejected push".to_string()));
        }
        self.pushes.lock().unwrap().push(branch.to_string());
        Ok(())
    }

    async fn status_summary(&self) -> AppResult<String> {
        Ok("  Working directory clean".to_string())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[derive(Default)]
pub struct FakeCodeHost {
    pub requests: Mutex<Vec<ReviewRequest>>,
    pub fail: bool,
}

impl FakeCodeHost {
    pub fn requests(&self) -> Vec<ReviewRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeHostService for FakeCodeHost {
    async fn create_request(&self, request: &ReviewRequest) -> AppResult<String> {
        if self.fail {
            return Err(AppError::Provider("merge request rejected".to_string()));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(format!("https://git.example.com/merge_requests/{}", requests.len()))
    }

    fn request_label(&self) -> &'static str {
        "MR"
    }
}

pub fn settings() -> Settings {
    sample_settings(ProviderKind::Gitlab)
}

pub fn context(
    tracker: &Arc<FakeTracker>,
    git: Option<&Arc<FakeGit>>,
    host: Option<&Arc<FakeCodeHost>>,
) -> AppContext {
    let version_control = git.map(|git| Arc::clone(git) as Arc<dyn VersionControlService>);
    let ctx = AppContext::new(
        settings(),
        version_control,
        Arc::clone(tracker) as Arc<dyn IssueTrackerService>,
    );
    match host {
        Some(host) => ctx.with_code_host(Arc::clone(host) as Arc<dyn CodeHostService>),
        None => ctx,
    }
}
