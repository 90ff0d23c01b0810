use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration not found; run 'devflow init' first")]
    ConfigurationMissing,
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
    #[error("branch does not encode a ticket id: {0}")]
    Correlation(String),
    #[error("version control error: {0}")]
    VersionControl(String),
    #[error("uncommitted changes detected; commit or stash before running 'devflow done'")]
    UncommittedChanges,
    #[error("issue tracker error: {0}")]
    IssueTracker(String),
    #[error("code host error: {0}")]
    Provider(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
