use tracing::debug;

use crate::context::AppContext;
use crate::domain::branch::extract_ticket_id;
use crate::domain::query::{
    DEFAULT_SEARCH_LIMIT, LIST_LIMIT, SearchPage, TicketFilter, TicketQuery,
};
use crate::domain::ticket::{Ticket, browse_url};
use crate::error::{AppError, AppResult};
use crate::infra::code_host::review_list_url;

#[derive(Debug, Clone)]
pub struct TicketResults {
    pub jql: String,
    pub page: SearchPage<Ticket>,
}

/// Tickets assigned to the current user, capped at [`LIST_LIMIT`].
pub async fn list_tickets(
    ctx: &AppContext,
    status: Option<String>,
    project: Option<String>,
) -> AppResult<TicketResults> {
    run_query(ctx, &TicketFilter::assigned_to_me(status, project), LIST_LIMIT).await
}

/// Free-text search. A zero limit falls back to [`DEFAULT_SEARCH_LIMIT`].
pub async fn search_tickets(
    ctx: &AppContext,
    filter: &TicketFilter,
    limit: usize,
) -> AppResult<TicketResults> {
    let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };
    run_query(ctx, filter, limit).await
}

async fn run_query(
    ctx: &AppContext,
    filter: &TicketFilter,
    limit: usize,
) -> AppResult<TicketResults> {
    let query = TicketQuery::build(filter, ctx.settings.jira.default_project()).ok_or_else(|| {
        AppError::IssueTracker("search needs text or an assignee".to_string())
    })?;
    let jql = query.to_jql();
    debug!(%jql, limit, "querying tickets");
    let items = ctx.issue_tracker.search(&jql, limit).await?;
    Ok(TicketResults {
        jql,
        page: SearchPage::new(items, limit),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// A ticket page; the current branch's ticket when no key is given.
    Ticket(Option<String>),
    PullRequests,
    Board,
}

pub async fn open_target_url(ctx: &AppContext, target: &OpenTarget) -> AppResult<String> {
    let tracker_url = ctx.settings.tracker_url();
    match target {
        OpenTarget::Ticket(Some(key)) => Ok(browse_url(tracker_url, key.trim())),
        OpenTarget::Ticket(None) => {
            let branch = ctx.version_control()?.current_branch().await?;
            let key = extract_ticket_id(&branch)?;
            Ok(browse_url(tracker_url, &key))
        }
        OpenTarget::Board => {
            let project = ctx.settings.jira.default_project().ok_or_else(|| {
                AppError::ConfigurationInvalid("jira.project_key not configured".to_string())
            })?;
            Ok(format!(
                "{tracker_url}/jira/software/projects/{project}/boards"
            ))
        }
        OpenTarget::PullRequests => {
            let version_control = ctx.version_control()?;
            let branch = version_control.current_branch().await?;
            let target = ctx
                .settings
                .code_host_target()?
                .with_default_project(Some(version_control.root()));
            Ok(review_list_url(&target, &branch))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::query::Assignee;
    use crate::workflow::fakes::{FakeGit, FakeTracker, context, ticket};

    fn tracker_with(count: usize) -> Arc<FakeTracker> {
        let tracker = Arc::new(FakeTracker::default());
        for n in 0..count {
            tracker.add(ticket(&format!("TEST-{n:03}"), "Widget"));
        }
        tracker
    }

    #[tokio::test]
    async fn list_uses_current_user_and_default_project() {
        let tracker = tracker_with(3);
        let ctx = context(&tracker, None, None);

        let results = list_tickets(&ctx, None, None).await.unwrap();

        assert_eq!(results.jql, "assignee = currentUser() AND project = \"TEST\"");
        assert_eq!(results.page.items.len(), 3);
        assert!(!results.page.truncated);
        assert_eq!(
            tracker.searches.lock().unwrap().clone(),
            vec![(results.jql.clone(), LIST_LIMIT)]
        );
    }

    #[tokio::test]
    async fn list_flags_truncation_at_fifty() {
        let tracker = tracker_with(60);
        let ctx = context(&tracker, None, None);

        let results = list_tickets(&ctx, Some("To Do".to_string()), None)
            .await
            .unwrap();

        assert_eq!(results.page.items.len(), 50);
        assert!(results.page.truncated);
        assert!(results.jql.ends_with("status = \"To Do\""));
    }

    #[tokio::test]
    async fn search_defaults_its_limit() {
        let tracker = tracker_with(12);
        let ctx = context(&tracker, None, None);
        let filter = TicketFilter {
            assignee: Assignee::parse("me"),
            ..TicketFilter::matching_text("widget")
        };

        let results = search_tickets(&ctx, &filter, 0).await.unwrap();

        assert_eq!(results.page.limit, DEFAULT_SEARCH_LIMIT);
        assert_eq!(results.page.items.len(), 10);
        assert!(results.page.truncated);
        assert!(results.jql.starts_with("(summary ~ \"widget\""));
    }

    #[tokio::test]
    async fn search_without_anchor_is_rejected() {
        let tracker = tracker_with(1);
        let ctx = context(&tracker, None, None);
        let filter = TicketFilter {
            status: Some("Done".to_string()),
            ..TicketFilter::default()
        };

        assert!(search_tickets(&ctx, &filter, 5).await.is_err());
        assert!(tracker.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolves_open_urls() {
        let tracker = tracker_with(0);
        let git = Arc::new(FakeGit::on_branch("feat/TEST-4/fix_login"));
        let ctx = context(&tracker, Some(&git), None);

        assert_eq!(
            open_target_url(&ctx, &OpenTarget::Ticket(Some("OPS-2".to_string())))
                .await
                .unwrap(),
            "https://jira.example.com/browse/OPS-2"
        );
        assert_eq!(
            open_target_url(&ctx, &OpenTarget::Ticket(None)).await.unwrap(),
            "https://jira.example.com/browse/TEST-4"
        );
        assert_eq!(
            open_target_url(&ctx, &OpenTarget::Board).await.unwrap(),
            "https://jira.example.com/jira/software/projects/TEST/boards"
        );
        assert_eq!(
            open_target_url(&ctx, &OpenTarget::PullRequests).await.unwrap(),
            "https://git.example.com/widgets/-/merge_requests?scope=all&state=opened&source_branch=feat%2FTEST%2D4%2Ffix%5Flogin"
        );
    }

    #[tokio::test]
    async fn inferred_ticket_needs_a_workflow_branch() {
        let tracker = tracker_with(0);
        let git = Arc::new(FakeGit::on_branch("main"));
        let ctx = context(&tracker, Some(&git), None);

        assert!(matches!(
            open_target_url(&ctx, &OpenTarget::Ticket(None)).await,
            Err(AppError::Correlation(_))
        ));
    }
}
