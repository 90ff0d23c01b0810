use std::io::{self, BufRead, Write};

use clap::{Args, Subcommand};

use crate::config::{
    AuthMethod, GitSettings, JiraSettings, Preferences, ProviderKind, Settings, SettingsStore,
    mask_secret, validate_branch_prefix,
};
use crate::domain::branch::DEFAULT_PREFIX;
use crate::error::{AppError, AppResult};
use crate::infra::github::DEFAULT_API_URL;
use crate::infra::jira::JiraClient;
use crate::services::IssueTrackerService;

const GITLAB_DEFAULT_URL: &str = "https://gitlab.com";

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the stored configuration (secrets masked).
    Show,
    /// Update a single value, e.g. `devflow config set jira.email me@example.com`.
    Set { key: String, value: String },
    /// Check the Jira connection and code host settings.
    Validate,
    /// Print the configuration file location.
    Path,
}

pub async fn run(store: &SettingsStore, command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Show => run_show(store),
        ConfigCommand::Set { key, value } => run_set(store, &key, &value),
        ConfigCommand::Validate => run_validate(store).await,
        ConfigCommand::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
    }
}

/// Interactive wizard. Existing values are offered as defaults.
pub async fn run_init(store: &SettingsStore) -> AppResult<()> {
    let existing = match store.load() {
        Ok(settings) => Some(settings),
        Err(AppError::ConfigurationMissing) => None,
        Err(err) => return Err(err),
    };

    println!("Configuring devflow.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    let settings = capture_settings(&mut Prompter::stdio(), existing.as_ref())?;

    store.save(&settings)?;
    println!("\nConfiguration saved to {}", store.path().display());

    println!("Testing Jira connection...");
    match check_jira(&settings).await {
        Ok(()) => println!("✓ Jira connection successful"),
        Err(err) => println!("⚠ Jira connection failed: {err}"),
    }
    Ok(())
}

fn capture_settings<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    existing: Option<&Settings>,
) -> AppResult<Settings> {
    let jira = existing.map(|settings| &settings.jira);
    let url = prompter.required(
        "Jira URL (e.g., https://company.atlassian.net)",
        jira.map(|jira| jira.url.as_str()),
        false,
    )?;
    let email = prompter
        .optional("Jira email", jira.map(|jira| jira.email.as_str()), false)?
        .unwrap_or_default();
    let auth_kind = prompter.required(
        "Jira auth method (api_token/personal_access_token)",
        Some(jira.map_or("api_token", |jira| jira.auth_method.as_str())),
        false,
    )?;
    let token = prompter.required("Jira token", jira.map(|jira| jira.auth_method.token()), true)?;
    let auth_method = AuthMethod::parse(&auth_kind, token)?;
    let project_key = prompter
        .optional(
            "Default Jira project key",
            jira.map(|jira| jira.project_key.as_str()),
            false,
        )?
        .unwrap_or_default();

    let git = existing.map(|settings| &settings.git);
    let provider = ProviderKind::parse(&prompter.required(
        "Git provider (github/gitlab)",
        Some(git.map_or("github", |git| git.provider.as_str())),
        false,
    )?)?;
    let default_base = match provider {
        ProviderKind::Github => DEFAULT_API_URL,
        ProviderKind::Gitlab => GITLAB_DEFAULT_URL,
    };
    let base_url = prompter.required(
        "Git API base URL",
        Some(git.map_or(default_base, |git| git.base_url.as_str())),
        false,
    )?;
    let git_token = prompter
        .optional("Git token", git.map(|git| git.token.as_str()), true)?
        .unwrap_or_default();

    let (owner, repo, project_path) = match provider {
        ProviderKind::Github => (
            prompter.optional("GitHub owner", git.and_then(|git| git.owner.as_deref()), false)?,
            prompter.optional("GitHub repository", git.and_then(|git| git.repo.as_deref()), false)?,
            None,
        ),
        ProviderKind::Gitlab => (
            None,
            None,
            prompter.optional(
                "GitLab project path (namespace/project, Enter to use the repository name)",
                git.and_then(|git| git.project_path.as_deref()),
                false,
            )?,
        ),
    };

    let preferences = existing.map(|settings| &settings.preferences);
    let branch_prefix = prompter
        .optional(
            "Branch prefix",
            Some(preferences.map_or(DEFAULT_PREFIX, Preferences::branch_prefix)),
            false,
        )?
        .map(|prefix| validate_branch_prefix(&prefix))
        .transpose()?;
    let default_transition = prompter.optional(
        "Transition applied by 'start' (e.g., In Progress)",
        preferences.and_then(Preferences::default_transition),
        false,
    )?;

    Ok(Settings {
        jira: JiraSettings {
            url,
            email,
            project_key,
            api_version: jira.and_then(|jira| jira.api_version.clone()),
            auth_method,
        },
        git: GitSettings {
            provider,
            base_url,
            token: git_token,
            owner,
            repo,
            project_path,
        },
        preferences: Preferences {
            branch_prefix,
            default_transition,
        },
    })
}

fn run_show(store: &SettingsStore) -> AppResult<()> {
    let settings = store.load()?;
    let jira = &settings.jira;
    let git = &settings.git;

    println!("Configuration file: {}", store.path().display());
    println!();
    println!("Jira:");
    println!("  URL: {}", display_value(&jira.url));
    println!("  Email: {}", display_value(&jira.email));
    println!("  Project: {}", display_value(&jira.project_key));
    println!("  API version: {}", jira.api_version());
    println!("  Auth method: {}", jira.auth_method.as_str());
    println!("  Token: {}", mask_secret(jira.auth_method.token()));
    println!();
    println!("Git:");
    println!("  Provider: {}", git.provider.as_str());
    println!("  Base URL: {}", display_value(&git.base_url));
    println!("  Token: {}", mask_secret(&git.token));
    match git.provider {
        ProviderKind::Github => {
            println!("  Owner: {}", display_option(&git.owner));
            println!("  Repository: {}", display_option(&git.repo));
        }
        ProviderKind::Gitlab => {
            println!("  Project path: {}", display_option(&git.project_path));
        }
    }
    println!();
    println!("Preferences:");
    println!("  Branch prefix: {}", settings.preferences.branch_prefix());
    println!(
        "  Default transition: {}",
        settings.preferences.default_transition().unwrap_or("<not set>")
    );
    Ok(())
}

fn run_set(store: &SettingsStore, key: &str, value: &str) -> AppResult<()> {
    let mut settings = store.load()?;
    settings.set(key, value)?;
    store.save(&settings)?;
    println!("✓ {key} updated");
    Ok(())
}

async fn run_validate(store: &SettingsStore) -> AppResult<()> {
    let settings = store.load()?;
    let mut failures = 0;

    match check_jira(&settings).await {
        Ok(()) => println!("✓ Jira connection successful"),
        Err(err) => {
            failures += 1;
            println!("✗ Jira connection failed: {err}");
        }
    }

    if settings.git.token.trim().is_empty() {
        failures += 1;
        println!("✗ Git token not configured");
    } else {
        println!("✓ Git token configured");
    }

    match settings.code_host_target() {
        Ok(_) => println!("✓ {} settings complete", settings.git.provider.as_str()),
        Err(err) => {
            failures += 1;
            println!("✗ {err}");
        }
    }

    if failures > 0 {
        return Err(AppError::ConfigurationInvalid(format!(
            "{failures} check(s) failed"
        )));
    }
    Ok(())
}

async fn check_jira(settings: &Settings) -> AppResult<()> {
    JiraClient::from_settings(&settings.jira)?
        .test_connection()
        .await
}

fn display_value(value: &str) -> &str {
    Some(value).filter(|v| !v.trim().is_empty()).unwrap_or("<not set>")
}

fn display_option(value: &Option<String>) -> &str {
    display_value(value.as_deref().unwrap_or_default())
}

#[derive(Debug, PartialEq, Eq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn from_input(input: &str) -> Self {
        match input.trim() {
            "" => PromptAction::Keep,
            "-" => PromptAction::Clear,
            value => PromptAction::Set(value.to_string()),
        }
    }
}

/// Line-oriented prompts over any reader/writer pair.
pub(crate) struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub(crate) fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    #[cfg(test)]
    fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one raw line after printing `label`.
    pub(crate) fn ask(&mut self, label: &str) -> AppResult<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn prompt(&mut self, field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
        let current = current.filter(|value| !value.trim().is_empty());
        let label = match (current, secret) {
            (Some(_), true) => format!("{field} [****] (Enter to keep, '-' to clear): "),
            (Some(value), false) => format!("{field} [{value}] (Enter to keep, '-' to clear): "),
            (None, _) => format!("{field} (Enter to skip): "),
        };
        let answer = self.ask(&label)?;
        Ok(PromptAction::from_input(&answer))
    }

    fn optional(
        &mut self,
        field: &str,
        current: Option<&str>,
        secret: bool,
    ) -> AppResult<Option<String>> {
        Ok(match self.prompt(field, current, secret)? {
            PromptAction::Keep => current
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string),
            PromptAction::Clear => None,
            PromptAction::Set(value) => Some(value),
        })
    }

    fn required(&mut self, field: &str, current: Option<&str>, secret: bool) -> AppResult<String> {
        self.optional(field, current, secret)?.ok_or_else(|| {
            AppError::ConfigurationInvalid(format!("{field} is required"))
        })
    }
}
