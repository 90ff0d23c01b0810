use tracing::{info, warn};

use crate::context::AppContext;
use crate::domain::branch::extract_ticket_id;
use crate::domain::ticket::ReviewRequest;
use crate::error::AppError;
use crate::workflow::outcome::{
    CreatedRequest, StepLog, WorkflowFailure, WorkflowOutcome, WorkflowStep,
};
use crate::workflow::transition_by_name;

pub const TARGET_BRANCH: &str = "main";
pub const IN_REVIEW: &str = "In Review";

/// Pushes the ticket branch, opens a review request against `main` and moves
/// the ticket to review.
///
/// A pushed branch is left on the remote if a later step fails.
pub async fn finish_ticket(ctx: &AppContext) -> Result<WorkflowOutcome, WorkflowFailure> {
    let mut log = StepLog::default();

    let version_control = log.gate(WorkflowStep::Preflight, ctx.version_control())?;
    let code_host = log.gate(WorkflowStep::Preflight, ctx.code_host())?;

    let clean = log.gate(
        WorkflowStep::CheckWorkingTree,
        version_control.is_clean().await,
    )?;
    if !clean {
        return Err(log.fail(WorkflowStep::CheckWorkingTree, AppError::UncommittedChanges));
    }
    log.succeed(WorkflowStep::CheckWorkingTree, "working tree clean");

    let branch = log.gate(
        WorkflowStep::ResolveTicket,
        version_control.current_branch().await,
    )?;
    let key = log.gate(WorkflowStep::ResolveTicket, extract_ticket_id(&branch))?;
    log.succeed(WorkflowStep::ResolveTicket, format!("{branch} -> {key}"));

    log.gate(WorkflowStep::PushBranch, version_control.push(&branch).await)?;
    log.succeed(WorkflowStep::PushBranch, format!("pushed {branch} to origin"));

    let ticket = log.gate(
        WorkflowStep::FetchTicket,
        ctx.issue_tracker.get_ticket(&key).await,
    )?;
    log.succeed(WorkflowStep::FetchTicket, format!("found: {}", ticket.summary));

    let request = ReviewRequest::for_ticket(
        &key,
        &ticket.summary,
        &branch,
        TARGET_BRANCH,
        ctx.settings.tracker_url(),
    );
    let url = log.gate(
        WorkflowStep::CreateRequest,
        code_host.create_request(&request).await,
    )?;
    let label = code_host.request_label();
    info!(key, %url, "review request created");
    log.succeed(WorkflowStep::CreateRequest, format!("{label} created: {url}"));

    match transition_by_name(ctx.issue_tracker.as_ref(), &key, IN_REVIEW).await {
        Ok(applied) => log.succeed(
            WorkflowStep::TransitionStatus,
            format!("status updated to '{}'", applied.name),
        ),
        Err(err) => {
            warn!(key, error = %err, "could not move ticket to review");
            log.warn(
                WorkflowStep::TransitionStatus,
                format!("could not update status to '{IN_REVIEW}': {err}"),
            );
        }
    }

    Ok(WorkflowOutcome {
        ticket_key: key,
        branch,
        summary: Some(ticket.summary),
        request: Some(CreatedRequest { label, url }),
        steps: log.into_reports(),
    })
}
