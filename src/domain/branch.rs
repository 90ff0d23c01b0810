use std::fmt;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PREFIX: &str = "feat";

const MAX_SLUG_WORDS: usize = 5;

/// A branch name of the form `{prefix}/{ticket}/{slug}`.
///
/// This is the only link between a git branch and its ticket; nothing else
/// records which branch belongs to which issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_parts(prefix: &str, ticket_key: &str, summary: &str) -> Self {
        let clean_ticket = ticket_key.trim();
        let slug = slugify(summary);
        if slug.is_empty() {
            Self(format!("{prefix}/{clean_ticket}"))
        } else {
            Self(format!("{prefix}/{clean_ticket}/{slug}"))
        }
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn format_branch_name(prefix: &str, ticket_key: &str, summary: &str) -> BranchName {
    BranchName::from_parts(prefix, ticket_key, summary)
}

/// Recovers the ticket key from the second `/` segment of a branch name.
///
/// Only the first two `-` separated parts are kept, so `feat/ABC-12-extra`
/// still yields `ABC-12`.
pub fn extract_ticket_id(branch: &str) -> AppResult<String> {
    let no_ticket = || AppError::Correlation(format!("'{branch}' does not contain a ticket id"));

    let mut segments = branch.split('/');
    let ticket_part = match (segments.next(), segments.next()) {
        (Some(_), Some(part)) => part,
        _ => return Err(no_ticket()),
    };
    if !ticket_part.contains('-') {
        return Err(no_ticket());
    }

    let parts: Vec<&str> = ticket_part.split('-').take(2).collect();
    match parts.as_slice() {
        [project, number] => Ok(format!("{project}-{number}")),
        _ => Err(no_ticket()),
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ':' | '!' | '?' | ',' | ';' | '.')
}

fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .split(is_separator)
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphabetic() || c.is_ascii_digit())
                .collect::<String>()
        })
        .filter(|word| word.chars().count() > 1)
        .take(MAX_SLUG_WORDS)
        .collect::<Vec<_>>()
        .join("_")
}
