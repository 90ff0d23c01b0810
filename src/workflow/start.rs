use tracing::{info, warn};

use crate::context::AppContext;
use crate::domain::branch::format_branch_name;
use crate::error::AppError;
use crate::workflow::outcome::{
    StartOutcome, StepLog, WorkflowFailure, WorkflowOutcome, WorkflowStep,
};
use crate::workflow::transition_by_name;

/// Fetches the ticket, creates its branch and moves it to the configured
/// default transition.
///
/// Returns [`StartOutcome::AlreadyStarted`] without touching anything when
/// the current branch already mentions the ticket. The status transition is
/// the only step allowed to fail without aborting.
pub async fn start_ticket(
    ctx: &AppContext,
    ticket_key: &str,
) -> Result<StartOutcome, WorkflowFailure> {
    let key = ticket_key.trim();
    let mut log = StepLog::default();

    if key.is_empty() {
        return Err(log.fail(
            WorkflowStep::FetchTicket,
            AppError::IssueTracker("ticket id must not be empty".to_string()),
        ));
    }

    if let Some(version_control) = &ctx.version_control {
        if let Ok(branch) = version_control.current_branch().await {
            if branch.to_uppercase().contains(&key.to_uppercase()) {
                info!(%branch, key, "ticket already started");
                return Ok(StartOutcome::AlreadyStarted { branch });
            }
        }
    }

    let ticket = log.gate(
        WorkflowStep::FetchTicket,
        ctx.issue_tracker.get_ticket(key).await,
    )?;
    log.succeed(
        WorkflowStep::FetchTicket,
        format!("found: {} [{}]", ticket.summary, ticket.status),
    );

    let prefix = ctx.settings.preferences.branch_prefix();
    let branch = format_branch_name(prefix, key, &ticket.summary);
    let version_control = log.gate(WorkflowStep::CreateBranch, ctx.version_control())?;
    log.gate(
        WorkflowStep::CreateBranch,
        version_control.create_branch(&branch).await,
    )?;
    log.succeed(WorkflowStep::CreateBranch, format!("created {branch}"));

    match ctx.settings.preferences.default_transition() {
        Some(transition) => {
            match transition_by_name(ctx.issue_tracker.as_ref(), key, transition).await {
                Ok(applied) => log.succeed(
                    WorkflowStep::TransitionStatus,
                    format!("status updated to '{}'", applied.name),
                ),
                Err(err) => {
                    warn!(key, transition, error = %err, "status transition failed");
                    log.warn(
                        WorkflowStep::TransitionStatus,
                        format!("could not update status to '{transition}': {err}"),
                    );
                }
            }
        }
        None => log.skip(
            WorkflowStep::TransitionStatus,
            "no default transition configured",
        ),
    }

    Ok(StartOutcome::Started(WorkflowOutcome {
        ticket_key: key.to_string(),
        branch: branch.to_string(),
        summary: Some(ticket.summary),
        request: None,
        steps: log.into_reports(),
    }))
}
