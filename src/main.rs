mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod logging;
mod services;
mod workflow;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::tickets::{self, ListArgs, OpenArgs, SearchArgs, TestJiraArgs};
use crate::cmd::workflow as workflow_cmd;
use crate::config::{Settings, SettingsStore};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::code_host::CodeHost;
use crate::infra::git::GitCli;
use crate::infra::jira::JiraClient;
use crate::services::VersionControlService;

#[derive(Parser)]
#[command(
    name = "devflow",
    author,
    version,
    about = "Jira and git workflow automation"
)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive setup of Jira and code host settings.
    Init,
    /// Fetch a ticket, create its branch and move it to in progress.
    Start(StartArgs),
    /// Show the current branch and its ticket.
    Status,
    /// List tickets assigned to you.
    List(ListArgs),
    /// Search tickets by text.
    Search(SearchArgs),
    /// Open the ticket, board or pull/merge requests in a browser.
    Open(OpenArgs),
    /// Commit all changes with a link to the current ticket.
    Commit(CommitArgs),
    /// Push the branch, open a pull/merge request and move the ticket to review.
    Done,
    /// Manage configuration.
    Config(ConfigArgs),
    /// Fetch one ticket with explicit Jira credentials.
    TestJira(TestJiraArgs),
}

#[derive(Args)]
struct StartArgs {
    /// Ticket id, e.g. PROJ-123.
    ticket: String,
}

#[derive(Args)]
struct CommitArgs {
    /// Commit message; the ticket link is appended.
    #[arg(short, long)]
    message: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(error) = run(cli.command).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> AppResult<()> {
    let store = SettingsStore::default_location;

    match command {
        Commands::Init => config_cmd::run_init(&store()?).await,
        Commands::Config(args) => config_cmd::run(&store()?, args.command).await,
        Commands::TestJira(args) => tickets::test_jira(args).await,
        Commands::Status => {
            let git = discover_repository().await?;
            let version_control = git.as_deref().map(|git| git as &dyn VersionControlService);
            workflow_cmd::status(version_control).await
        }
        Commands::Start(args) => {
            let ctx = build_context(store()?.load()?, false).await?;
            workflow_cmd::start(&ctx, &args.ticket).await
        }
        Commands::List(args) => {
            let ctx = build_context(store()?.load()?, false).await?;
            tickets::list(&ctx, args).await
        }
        Commands::Search(args) => {
            let ctx = build_context(store()?.load()?, false).await?;
            tickets::search(&ctx, args).await
        }
        Commands::Open(args) => {
            let ctx = build_context(store()?.load()?, false).await?;
            tickets::open(&ctx, args).await
        }
        Commands::Commit(args) => {
            let ctx = build_context(store()?.load()?, false).await?;
            workflow_cmd::commit(&ctx, &args.message).await
        }
        Commands::Done => {
            let ctx = build_context(store()?.load()?, true).await?;
            workflow_cmd::done(&ctx).await
        }
    }
}

/// Wires the real gateways. A missing repository is not an error here; the
/// workflows that need one report it themselves.
async fn build_context(settings: Settings, with_code_host: bool) -> AppResult<AppContext> {
    let git = discover_repository().await?;
    let issue_tracker = Arc::new(JiraClient::from_settings(&settings.jira)?);

    let code_host = if with_code_host {
        let root = git.as_deref().map(|git| git.root());
        let target = settings.code_host_target()?.with_default_project(root);
        Some(Arc::new(CodeHost::from_target(&target)?))
    } else {
        None
    };

    let version_control = git.map(|git| git as Arc<dyn VersionControlService>);
    let ctx = AppContext::new(settings, version_control, issue_tracker);
    Ok(match code_host {
        Some(code_host) => ctx.with_code_host(code_host),
        None => ctx,
    })
}

async fn discover_repository() -> AppResult<Option<Arc<GitCli>>> {
    let cwd = std::env::current_dir()?;
    Ok(match GitCli::discover(&cwd).await {
        Ok(git) => Some(Arc::new(git)),
        Err(err) => {
            debug!(error = %err, "no repository");
            None
        }
    })
}
