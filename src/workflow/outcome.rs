use std::fmt;

use thiserror::Error;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Preflight,
    FetchTicket,
    CreateBranch,
    TransitionStatus,
    ResolveTicket,
    Commit,
    CheckWorkingTree,
    PushBranch,
    CreateRequest,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Preflight => "check prerequisites",
            WorkflowStep::FetchTicket => "fetch ticket",
            WorkflowStep::CreateBranch => "create branch",
            WorkflowStep::TransitionStatus => "update ticket status",
            WorkflowStep::ResolveTicket => "resolve ticket from branch",
            WorkflowStep::Commit => "commit changes",
            WorkflowStep::CheckWorkingTree => "check working tree",
            WorkflowStep::PushBranch => "push branch",
            WorkflowStep::CreateRequest => "create review request",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded(String),
    /// A soft step failed; the workflow carried on.
    Warned(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: WorkflowStep,
    pub status: StepStatus,
}

/// A hard step failed. Carries every step reported before it so the caller
/// can tell what already happened.
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct WorkflowFailure {
    pub step: WorkflowStep,
    pub completed: Vec<StepReport>,
    pub source: AppError,
}

impl WorkflowFailure {
    pub fn into_error(self) -> AppError {
        self.source
    }
}

#[derive(Debug, Default)]
pub struct StepLog {
    reports: Vec<StepReport>,
}

impl StepLog {
    pub fn succeed(&mut self, step: WorkflowStep, detail: impl Into<String>) {
        self.push(step, StepStatus::Succeeded(detail.into()));
    }

    pub fn warn(&mut self, step: WorkflowStep, detail: impl Into<String>) {
        self.push(step, StepStatus::Warned(detail.into()));
    }

    pub fn skip(&mut self, step: WorkflowStep, detail: impl Into<String>) {
        self.push(step, StepStatus::Skipped(detail.into()));
    }

    /// Passes a successful value through, or aborts the workflow at `step`.
    pub fn gate<T>(&self, step: WorkflowStep, result: AppResult<T>) -> Result<T, WorkflowFailure> {
        result.map_err(|source| self.fail(step, source))
    }

    pub fn fail(&self, step: WorkflowStep, source: AppError) -> WorkflowFailure {
        WorkflowFailure {
            step,
            completed: self.reports.clone(),
            source,
        }
    }

    pub fn into_reports(self) -> Vec<StepReport> {
        self.reports
    }

    fn push(&mut self, step: WorkflowStep, status: StepStatus) {
        self.reports.push(StepReport { step, status });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRequest {
    pub label: &'static str,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub ticket_key: String,
    pub branch: String,
    pub summary: Option<String>,
    pub request: Option<CreatedRequest>,
    pub steps: Vec<StepReport>,
}

impl WorkflowOutcome {
    pub fn warnings(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|report| matches!(report.status, StepStatus::Warned(_)))
    }

    pub fn status_of(&self, step: WorkflowStep) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|report| report.step == step)
            .map(|report| &report.status)
    }
}

#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// The current branch already belongs to the ticket; nothing was done.
    AlreadyStarted { branch: String },
    Started(WorkflowOutcome),
}
