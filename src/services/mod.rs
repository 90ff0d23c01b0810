pub mod code_host;
pub mod issue_tracker;
pub mod version_control;

pub use code_host::CodeHostService;
pub use issue_tracker::IssueTrackerService;
pub use version_control::VersionControlService;
