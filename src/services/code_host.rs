use async_trait::async_trait;

use crate::domain::ticket::ReviewRequest;
use crate::error::AppResult;

/// Opens a request to merge one branch into another on the code host.
#[async_trait]
pub trait CodeHostService: Send + Sync {
    /// Returns the web URL of the created pull/merge request.
    async fn create_request(&self, request: &ReviewRequest) -> AppResult<String>;

    /// Short label used in output, e.g. "PR" or "MR".
    fn request_label(&self) -> &'static str;
}
