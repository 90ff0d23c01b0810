use std::sync::Arc;

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::services::{CodeHostService, IssueTrackerService, VersionControlService};

/// Everything one command invocation works with. Gateways are handed in by
/// the caller so tests can substitute in-memory fakes.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub version_control: Option<Arc<dyn VersionControlService>>,
    pub issue_tracker: Arc<dyn IssueTrackerService>,
    pub code_host: Option<Arc<dyn CodeHostService>>,
}

impl AppContext {
    pub fn new(
        settings: Settings,
        version_control: Option<Arc<dyn VersionControlService>>,
        issue_tracker: Arc<dyn IssueTrackerService>,
    ) -> Self {
        Self {
            settings,
            version_control,
            issue_tracker,
            code_host: None,
        }
    }

    pub fn with_code_host(mut self, code_host: Arc<dyn CodeHostService>) -> Self {
        self.code_host = Some(code_host);
        self
    }

    pub fn version_control(&self) -> AppResult<&dyn VersionControlService> {
        self.version_control
            .as_deref()
            .ok_or_else(|| AppError::VersionControl("not in a git repository".to_string()))
    }

    pub fn code_host(&self) -> AppResult<&dyn CodeHostService> {
        self.code_host.as_deref().ok_or_else(|| {
            AppError::ConfigurationInvalid("no code host configured".to_string())
        })
    }
}
