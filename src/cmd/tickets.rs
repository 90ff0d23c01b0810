use clap::Args;

use crate::cmd::config::Prompter;
use crate::cmd::workflow;
use crate::config::{AuthMethod, JiraSettings};
use crate::context::AppContext;
use crate::domain::query::{Assignee, DEFAULT_SEARCH_LIMIT, TicketFilter};
use crate::domain::ticket::Ticket;
use crate::error::{AppError, AppResult};
use crate::infra::browser::open_url;
use crate::infra::jira::JiraClient;
use crate::services::IssueTrackerService;
use crate::workflow::tickets::{
    OpenTarget, TicketResults, list_tickets, open_target_url, search_tickets,
};

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only tickets in this status.
    #[arg(short, long)]
    pub status: Option<String>,
    /// Project key; defaults to the configured project.
    #[arg(short, long)]
    pub project: Option<String>,
    /// Print the tickets as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Text matched against summary and description.
    pub text: String,
    /// Assignee name, or `me` for yourself.
    #[arg(short, long)]
    pub assignee: Option<String>,
    #[arg(short, long)]
    pub status: Option<String>,
    #[arg(short, long)]
    pub project: Option<String>,
    #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: usize,
    /// Pick a result and start working on it.
    #[arg(short, long)]
    pub interactive: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OpenArgs {
    /// Ticket to open; defaults to the current branch's ticket.
    pub ticket: Option<String>,
    /// Open the pull/merge requests for the current branch.
    #[arg(long, conflicts_with_all = ["board", "ticket"])]
    pub pr: bool,
    /// Open the project board.
    #[arg(long, conflicts_with = "ticket")]
    pub board: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TestJiraArgs {
    pub ticket: String,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub token: String,
}

pub async fn list(ctx: &AppContext, args: ListArgs) -> AppResult<()> {
    let results = list_tickets(ctx, args.status, args.project).await?;
    if args.json {
        let json = serde_json::to_string_pretty(&results.page.items).map_err(|err| {
            AppError::IssueTracker(format!("failed to encode tickets: {err}"))
        })?;
        println!("{json}");
        return Ok(());
    }
    print_results(&results, "No tickets assigned to you.");
    Ok(())
}

pub async fn search(ctx: &AppContext, args: SearchArgs) -> AppResult<()> {
    let filter = TicketFilter {
        assignee: args.assignee.as_deref().and_then(Assignee::parse),
        status: args.status,
        project: args.project,
        ..TicketFilter::matching_text(args.text)
    };
    let results = search_tickets(ctx, &filter, args.limit).await?;
    println!("{}\n", query_line(&results));
    print_results(&results, "No tickets matched.");

    if !args.interactive || results.page.items.is_empty() {
        return Ok(());
    }
    let count = results.page.items.len();
    let answer = Prompter::stdio().ask(&format!(
        "\nSelect a ticket to start (1-{count}, Enter to cancel): "
    ))?;
    match parse_selection(&answer, count) {
        Some(index) => workflow::start(ctx, &results.page.items[index].key).await,
        None => {
            println!("Cancelled.");
            Ok(())
        }
    }
}

pub async fn open(ctx: &AppContext, args: OpenArgs) -> AppResult<()> {
    let target = if args.pr {
        OpenTarget::PullRequests
    } else if args.board {
        OpenTarget::Board
    } else {
        OpenTarget::Ticket(args.ticket)
    };
    let url = open_target_url(ctx, &target).await?;
    println!("Opening {url}");
    open_url(&url)
}

/// Fetches one ticket with throwaway credentials, bypassing stored settings.
pub async fn test_jira(args: TestJiraArgs) -> AppResult<()> {
    let settings = JiraSettings {
        url: args.url,
        email: args.email,
        project_key: String::new(),
        api_version: None,
        auth_method: AuthMethod::ApiToken { token: args.token },
    };
    let client = JiraClient::from_settings(&settings)?;
    let ticket = client.get_ticket(args.ticket.trim()).await?;

    println!("✓ Fetched {}", ticket.key);
    println!("  Summary: {}", ticket.summary);
    println!("  Status: {}", ticket.status);
    println!(
        "  Assignee: {}",
        ticket.assignee.as_deref().unwrap_or("Unassigned")
    );
    if let Some(description) = &ticket.description {
        println!("  Description: {description}");
    }
    Ok(())
}

fn print_results(results: &TicketResults, empty: &str) {
    let page = &results.page;
    if page.items.is_empty() {
        println!("{empty}");
        return;
    }
    for (index, ticket) in page.items.iter().enumerate() {
        println!("{:>3}. {}", index + 1, ticket_line(ticket));
    }
    if page.truncated {
        println!(
            "\nShowing the first {} results; more may exist. Narrow the query to see the rest.",
            page.limit
        );
    }
}

fn query_line(results: &TicketResults) -> String {
    format!("  JQL: {}", results.jql)
}

fn ticket_line(ticket: &Ticket) -> String {
    let assignee = ticket.assignee.as_deref().unwrap_or("Unassigned");
    format!(
        "{:<12} [{}] {} ({assignee})",
        ticket.key, ticket.status, ticket.summary
    )
}

/// One-based answer to a zero-based index; anything else cancels.
fn parse_selection(answer: &str, count: usize) -> Option<usize> {
    let choice: usize = answer.trim().parse().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}
