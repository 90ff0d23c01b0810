pub mod commit;
pub mod done;
pub mod outcome;
pub mod start;
pub mod status;
pub mod tickets;

#[cfg(test)]
pub(crate) mod fakes;

use tracing::info;

use crate::domain::ticket::Transition;
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;

/// Moves a ticket through the transition whose name matches `name`.
pub(crate) async fn transition_by_name(
    tracker: &dyn IssueTrackerService,
    key: &str,
    name: &str,
) -> AppResult<Transition> {
    let transitions = tracker.list_transitions(key).await?;
    let transition = Transition::find_by_name(&transitions, name)
        .cloned()
        .ok_or_else(|| {
            AppError::IssueTracker(format!("transition '{name}' not found for {key}"))
        })?;
    tracker.apply_transition(key, &transition.id).await?;
    info!(key, transition = %transition.name, "ticket transitioned");
    Ok(transition)
}
