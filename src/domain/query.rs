//! JQL construction for the `list` and `search` commands.

pub const LIST_LIMIT: usize = 50;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

const CURRENT_USER: &str = "me";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignee {
    CurrentUser,
    Named(String),
}

impl Assignee {
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed == CURRENT_USER {
            Some(Assignee::CurrentUser)
        } else {
            Some(Assignee::Named(trimmed.to_string()))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub text: Option<String>,
    pub assignee: Option<Assignee>,
    pub status: Option<String>,
    pub project: Option<String>,
}

impl TicketFilter {
    /// Tickets assigned to the authenticated user.
    pub fn assigned_to_me(status: Option<String>, project: Option<String>) -> Self {
        Self {
            text: None,
            assignee: Some(Assignee::CurrentUser),
            status,
            project,
        }
    }

    pub fn matching_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Text(String),
    Assignee(Assignee),
    Project(String),
    Status(String),
}

impl Clause {
    fn render(&self) -> String {
        match self {
            Clause::Text(text) => {
                let literal = quote(text);
                format!("(summary ~ {literal} OR description ~ {literal})")
            }
            Clause::Assignee(Assignee::CurrentUser) => "assignee = currentUser()".to_string(),
            Clause::Assignee(Assignee::Named(name)) => format!("assignee = {}", quote(name)),
            Clause::Project(key) => format!("project = {}", quote(key)),
            Clause::Status(status) => format!("status = {}", quote(status)),
        }
    }
}

/// An ordered conjunction of clauses: text, assignee, project, status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    clauses: Vec<Clause>,
}

impl TicketQuery {
    /// Returns `None` when no clause would anchor the query.
    pub fn build(filter: &TicketFilter, default_project: Option<&str>) -> Option<Self> {
        let mut clauses = Vec::new();

        if let Some(text) = non_empty(filter.text.as_deref()) {
            clauses.push(Clause::Text(text.to_string()));
        }
        if let Some(assignee) = &filter.assignee {
            clauses.push(Clause::Assignee(assignee.clone()));
        }
        if clauses.is_empty() {
            return None;
        }

        let project = non_empty(filter.project.as_deref()).or(non_empty(default_project));
        if let Some(project) = project {
            clauses.push(Clause::Project(project.to_string()));
        }
        if let Some(status) = non_empty(filter.status.as_deref()) {
            clauses.push(Clause::Status(status.to_string()));
        }

        Some(Self { clauses })
    }

    pub fn to_jql(&self) -> String {
        self.clauses
            .iter()
            .map(Clause::render)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Results of a bounded query. `truncated` is set when the tracker returned
/// exactly as many tickets as the limit allowed, so more may exist.
#[derive(Debug, Clone)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub limit: usize,
    pub truncated: bool,
}

impl<T> SearchPage<T> {
    pub fn new(items: Vec<T>, limit: usize) -> Self {
        let truncated = limit > 0 && items.len() == limit;
        Self {
            items,
            limit,
            truncated,
        }
    }
}
