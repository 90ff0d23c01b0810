use async_trait::async_trait;

use crate::domain::ticket::{Ticket, Transition};
use crate::error::AppResult;

#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    async fn get_ticket(&self, key: &str) -> AppResult<Ticket>;
    async fn list_transitions(&self, key: &str) -> AppResult<Vec<Transition>>;
    async fn apply_transition(&self, key: &str, transition_id: &str) -> AppResult<()>;
    async fn search(&self, jql: &str, limit: usize) -> AppResult<Vec<Ticket>>;
    async fn test_connection(&self) -> AppResult<()>;
}
