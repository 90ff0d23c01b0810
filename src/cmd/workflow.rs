use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::services::VersionControlService;
use crate::workflow::commit::commit_changes;
use crate::workflow::done::{IN_REVIEW, finish_ticket};
use crate::workflow::outcome::{
    StartOutcome, StepReport, StepStatus, WorkflowFailure, WorkflowStep,
};
use crate::workflow::start::start_ticket;
use crate::workflow::status::current_status;

pub async fn start(ctx: &AppContext, ticket_key: &str) -> AppResult<()> {
    println!("Starting work on {}...", ticket_key.trim());
    match start_ticket(ctx, ticket_key).await.map_err(report_failure)? {
        StartOutcome::AlreadyStarted { branch } => {
            println!("Already on {branch}; nothing to do.");
        }
        StartOutcome::Started(outcome) => {
            print_steps(&outcome.steps);
            println!();
            println!("Ready to work on {}", outcome.ticket_key);
            println!("  Branch: {}", outcome.branch);
            if let Some(summary) = &outcome.summary {
                println!("  Summary: {summary}");
            }
            if outcome.warnings().next().is_some() {
                println!("  Finished with warnings; see above.");
            }
        }
    }
    Ok(())
}

pub async fn commit(ctx: &AppContext, message: &str) -> AppResult<()> {
    let outcome = commit_changes(ctx, message).await.map_err(report_failure)?;
    print_steps(&outcome.steps);
    Ok(())
}

pub async fn done(ctx: &AppContext) -> AppResult<()> {
    println!("Finishing work...");
    let outcome = finish_ticket(ctx).await.map_err(report_failure)?;
    print_steps(&outcome.steps);
    println!();
    println!("Work on {} handed off for review", outcome.ticket_key);
    if let Some(request) = &outcome.request {
        println!("  {}: {}", request.label, request.url);
    }
    if let Some(StepStatus::Warned(_)) = outcome.status_of(WorkflowStep::TransitionStatus) {
        println!("  Move {} to '{IN_REVIEW}' by hand.", outcome.ticket_key);
    }
    Ok(())
}

pub async fn status(version_control: Option<&dyn VersionControlService>) -> AppResult<()> {
    let report = current_status(version_control).await;
    match &report.branch {
        Ok(branch) => println!("Current branch: {branch}"),
        Err(reason) => {
            println!("Current branch: ({reason})");
            if !report.in_repository {
                return Ok(());
            }
        }
    }
    match &report.ticket_key {
        Some(key) => println!("Ticket: {key}"),
        None => println!("Ticket: none (branch is not a ticket branch)"),
    }
    if let Some(changes) = &report.changes {
        println!("Changes:");
        println!("{changes}");
    }
    Ok(())
}

fn print_steps(steps: &[StepReport]) {
    for report in steps {
        println!("{}", render_step(report));
    }
}

fn render_step(report: &StepReport) -> String {
    match &report.status {
        StepStatus::Succeeded(detail) => format!("✓ {}: {detail}", report.step),
        StepStatus::Warned(detail) => format!("⚠ {}: {detail}", report.step),
        StepStatus::Skipped(detail) => format!("- {} skipped: {detail}", report.step),
    }
}

/// Prints what already happened, then hands the error back for exit.
fn report_failure(failure: WorkflowFailure) -> AppError {
    print_steps(&failure.completed);
    println!("✗ {} failed", failure.step);
    failure.into_error()
}
