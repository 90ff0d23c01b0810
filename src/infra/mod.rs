pub mod browser;
pub mod code_host;
pub mod git;
pub mod github;
pub mod gitlab;
pub mod jira;
