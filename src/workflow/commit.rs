use tracing::info;

use crate::context::AppContext;
use crate::domain::branch::extract_ticket_id;
use crate::domain::ticket::browse_url;
use crate::error::AppError;
use crate::workflow::outcome::{StepLog, WorkflowFailure, WorkflowOutcome, WorkflowStep};

/// Appends the ticket trailer to a commit message.
pub fn commit_message(message: &str, ticket_key: &str, tracker_url: &str) -> String {
    format!(
        "{}\n\n{ticket_key}: {}",
        message.trim_end(),
        browse_url(tracker_url, ticket_key)
    )
}

/// Stages everything and commits it with the message plus a link to the
/// ticket named by the current branch.
pub async fn commit_changes(
    ctx: &AppContext,
    message: &str,
) -> Result<WorkflowOutcome, WorkflowFailure> {
    let mut log = StepLog::default();

    let version_control = log.gate(WorkflowStep::ResolveTicket, ctx.version_control())?;
    let branch = log.gate(
        WorkflowStep::ResolveTicket,
        version_control.current_branch().await,
    )?;
    let key = log.gate(WorkflowStep::ResolveTicket, extract_ticket_id(&branch))?;
    log.succeed(WorkflowStep::ResolveTicket, format!("{branch} -> {key}"));

    if message.trim().is_empty() {
        return Err(log.fail(
            WorkflowStep::Commit,
            AppError::VersionControl("commit message must not be empty".to_string()),
        ));
    }

    let full_message = commit_message(message, &key, ctx.settings.tracker_url());
    log.gate(WorkflowStep::Commit, version_control.commit(&full_message).await)?;
    info!(%branch, key, "committed");
    log.succeed(WorkflowStep::Commit, format!("committed with reference to {key}"));

    Ok(WorkflowOutcome {
        ticket_key: key,
        branch,
        summary: None,
        request: None,
        steps: log.into_reports(),
    })
}
