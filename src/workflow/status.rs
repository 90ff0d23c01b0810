use crate::domain::branch::extract_ticket_id;
use crate::error::AppError;
use crate::services::VersionControlService;

/// Where the working tree stands. Never fails; problems are reported in the
/// fields instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub in_repository: bool,
    pub branch: Result<String, String>,
    pub ticket_key: Option<String>,
    pub changes: Option<String>,
}

/// Reads only the repository, so it works before any settings exist.
pub async fn current_status(version_control: Option<&dyn VersionControlService>) -> StatusReport {
    let Some(version_control) = version_control else {
        return StatusReport {
            in_repository: false,
            branch: Err("not in a git repository".to_string()),
            ticket_key: None,
            changes: None,
        };
    };

    let branch = version_control
        .current_branch()
        .await
        .map_err(|err| describe(&err));
    let ticket_key = branch
        .as_deref()
        .ok()
        .and_then(|branch| extract_ticket_id(branch).ok());
    let changes = version_control.status_summary().await.ok();

    StatusReport {
        in_repository: true,
        branch,
        ticket_key,
        changes,
    }
}

fn describe(err: &AppError) -> String {
    match err {
        AppError::VersionControl(message) => message.clone(),
        other => other.to_string(),
    }
}
