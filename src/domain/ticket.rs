use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: String,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

impl Transition {
    pub fn find_by_name<'a>(transitions: &'a [Transition], name: &str) -> Option<&'a Transition> {
        let wanted = name.trim().to_lowercase();
        transitions
            .iter()
            .find(|transition| transition.name.to_lowercase() == wanted)
    }
}

/// Title and body for the pull/merge request opened by `done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
}

impl ReviewRequest {
    pub fn for_ticket(
        key: &str,
        summary: &str,
        branch: &str,
        target: &str,
        tracker_url: &str,
    ) -> Self {
        Self {
            source_branch: branch.to_string(),
            target_branch: target.to_string(),
            title: format!("{key}: {summary}"),
            description: format!("Resolves {key}\n\nJira: {}", browse_url(tracker_url, key)),
        }
    }
}

pub fn browse_url(tracker_url: &str, key: &str) -> String {
    format!("{}/browse/{}", tracker_url.trim_end_matches('/'), key)
}
