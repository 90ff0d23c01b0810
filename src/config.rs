use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::branch::DEFAULT_PREFIX;
use crate::error::{AppError, AppResult};

const CONFIG_DIR_NAME: &str = ".devflow";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_API_VERSION: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub jira: JiraSettings,
    pub git: GitSettings,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraSettings {
    pub url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub project_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub auth_method: AuthMethod,
}

impl JiraSettings {
    pub fn api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_API_VERSION)
    }

    pub fn default_project(&self) -> Option<&str> {
        Some(self.project_key.trim()).filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    /// Bearer token, used by Jira Data Center/Server.
    PersonalAccessToken { token: String },
    /// Email plus API token as basic auth, used by Jira Cloud.
    ApiToken { token: String },
}

impl AuthMethod {
    pub fn parse(kind: &str, token: String) -> AppResult<Self> {
        match kind.trim().to_lowercase().as_str() {
            "personal_access_token" | "pat" => Ok(AuthMethod::PersonalAccessToken { token }),
            "api_token" => Ok(AuthMethod::ApiToken { token }),
            other => Err(AppError::ConfigurationInvalid(format!(
                "unknown auth method '{other}' (expected personal_access_token or api_token)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::PersonalAccessToken { .. } => "personal_access_token",
            AuthMethod::ApiToken { .. } => "api_token",
        }
    }

    pub fn token(&self) -> &str {
        match self {
            AuthMethod::PersonalAccessToken { token } | AuthMethod::ApiToken { token } => token,
        }
    }

    fn with_token(&self, token: String) -> Self {
        match self {
            AuthMethod::PersonalAccessToken { .. } => AuthMethod::PersonalAccessToken { token },
            AuthMethod::ApiToken { .. } => AuthMethod::ApiToken { token },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Github,
    Gitlab,
}

impl ProviderKind {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "github" => Ok(ProviderKind::Github),
            "gitlab" => Ok(ProviderKind::Gitlab),
            other => Err(AppError::ConfigurationInvalid(format!(
                "unsupported git provider '{other}' (expected github or gitlab)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Github => "github",
            ProviderKind::Gitlab => "gitlab",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSettings {
    pub provider: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// GitLab `namespace/project`; defaults to the repository directory name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_transition: Option<String>,
}

impl Preferences {
    pub fn branch_prefix(&self) -> &str {
        non_blank(self.branch_prefix.as_deref()).unwrap_or(DEFAULT_PREFIX)
    }

    pub fn default_transition(&self) -> Option<&str> {
        non_blank(self.default_transition.as_deref())
    }
}

/// A prefix becomes the first `/` segment of every branch, so it must be a
/// single non-empty segment for the ticket id to be recoverable.
pub fn validate_branch_prefix(value: &str) -> AppResult<String> {
    let prefix = value.trim();
    if prefix.is_empty() || prefix.contains('/') || prefix.contains(char::is_whitespace) {
        return Err(AppError::ConfigurationInvalid(format!(
            "branch prefix '{value}' must be one word without '/'"
        )));
    }
    Ok(prefix.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn optional(value: &str) -> Option<String> {
    non_blank(Some(value)).map(str::to_string)
}

/// Code host coordinates resolved from settings. Built once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeHostTarget {
    GitHub {
        base_url: String,
        token: String,
        owner: String,
        repo: String,
    },
    GitLab {
        base_url: String,
        token: String,
        project_path: Option<String>,
    },
}

impl CodeHostTarget {
    /// Names a GitLab project after the repository directory when no path
    /// is configured.
    pub fn with_default_project(self, repo_root: Option<&Path>) -> Self {
        match self {
            CodeHostTarget::GitLab {
                base_url,
                token,
                project_path: None,
            } => CodeHostTarget::GitLab {
                base_url,
                token,
                project_path: repo_root
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned()),
            },
            other => other,
        }
    }
}

impl Settings {
    pub fn tracker_url(&self) -> &str {
        self.jira.url.trim_end_matches('/')
    }

    pub fn code_host_target(&self) -> AppResult<CodeHostTarget> {
        let git = &self.git;
        match git.provider {
            ProviderKind::Github => {
                let owner = non_blank(git.owner.as_deref());
                let repo = non_blank(git.repo.as_deref());
                match (owner, repo) {
                    (Some(owner), Some(repo)) => Ok(CodeHostTarget::GitHub {
                        base_url: git.base_url.clone(),
                        token: git.token.clone(),
                        owner: owner.to_string(),
                        repo: repo.to_string(),
                    }),
                    _ => Err(AppError::ConfigurationInvalid(
                        "GitHub owner/repo not configured".to_string(),
                    )),
                }
            }
            ProviderKind::Gitlab => Ok(CodeHostTarget::GitLab {
                base_url: git.base_url.clone(),
                token: git.token.clone(),
                project_path: non_blank(git.project_path.as_deref()).map(str::to_string),
            }),
        }
    }

    /// Updates a single `section.field` key in place.
    pub fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let (section, field) = key.split_once('.').ok_or_else(|| {
            AppError::ConfigurationInvalid(
                "invalid key format; use section.field (e.g., jira.email)".to_string(),
            )
        })?;
        let unknown = |kind: &str| {
            AppError::ConfigurationInvalid(format!("unknown {kind} field: {field}"))
        };

        match section {
            "jira" => match field {
                "url" => self.jira.url = value.trim().to_string(),
                "email" => self.jira.email = value.trim().to_string(),
                "project_key" => self.jira.project_key = value.trim().to_string(),
                "api_version" => self.jira.api_version = optional(value),
                "token" => self.jira.auth_method = self.jira.auth_method.with_token(value.to_string()),
                "auth_method" => {
                    let token = self.jira.auth_method.token().to_string();
                    self.jira.auth_method = AuthMethod::parse(value, token)?;
                }
                _ => return Err(unknown("jira")),
            },
            "git" => match field {
                "provider" => self.git.provider = ProviderKind::parse(value)?,
                "base_url" => self.git.base_url = value.trim().to_string(),
                "token" => self.git.token = value.to_string(),
                "owner" => self.git.owner = optional(value),
                "repo" => self.git.repo = optional(value),
                "project_path" => self.git.project_path = optional(value),
                _ => return Err(unknown("git")),
            },
            "preferences" => match field {
                "branch_prefix" => {
                    self.preferences.branch_prefix = Some(validate_branch_prefix(value)?)
                }
                "default_transition" => self.preferences.default_transition = optional(value),
                _ => return Err(unknown("preferences")),
            },
            other => {
                return Err(AppError::ConfigurationInvalid(format!(
                    "unknown configuration section: {other}"
                )));
            }
        }
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        AppError::ConfigurationInvalid("unable to resolve home directory".to_string())
    })?;
    Ok(home.join(CONFIG_DIR_NAME))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

/// Reads and writes the single on-disk settings record.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> AppResult<Self> {
        Ok(Self::new(config_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<Settings> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::ConfigurationMissing);
            }
            Err(err) => return Err(AppError::Io(err)),
        };
        debug!(path = %self.path.display(), "loaded settings");
        toml::from_str(&contents).map_err(|err| {
            AppError::ConfigurationInvalid(format!(
                "failed to parse {}: {err}",
                self.path.display()
            ))
        })
    }

    /// Writes the whole record, replacing whatever was on disk.
    pub fn save(&self, settings: &Settings) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(settings).map_err(|err| {
            AppError::ConfigurationInvalid(format!("failed to serialize settings: {err}"))
        })?;
        let mut file = open_private(&self.path)?;
        file.write_all(data.as_bytes())?;
        restrict_permissions(&self.path)?;
        debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> AppResult<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    Ok(fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> AppResult<fs::File> {
    Ok(fs::File::create(path)?)
}

/// `mode` only applies on creation; an existing file keeps its old bits.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> AppResult<()> {
    Ok(())
}

pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        "<not set>".to_string()
    } else if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}***{tail}")
    }
}

#[cfg(test)]
pub(crate) fn sample_settings(provider: ProviderKind) -> Settings {
    Settings {
        jira: JiraSettings {
            url: "https://jira.example.com".to_string(),
            email: "dev@example.com".to_string(),
            project_key: "TEST".to_string(),
            api_version: None,
            auth_method: AuthMethod::ApiToken {
                token: "jira-token".to_string(),
            },
        },
        git: GitSettings {
            provider,
            base_url: "https://git.example.com".to_string(),
            token: "git-token".to_string(),
            owner: Some("acme".to_string()),
            repo: Some("widgets".to_string()),
            project_path: None,
        },
        preferences: Preferences {
            branch_prefix: Some("feat".to_string()),
            default_transition: Some("In Progress".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_is_reported_as_missing_configuration() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("config.toml"));
        assert!(matches!(store.load(), Err(AppError::ConfigurationMissing)));
    }

    #[test]
    fn saves_and_reloads_settings() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("config.toml"));
        let settings = sample_settings(ProviderKind::Gitlab);

        store.save(&settings).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, settings);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("[jira.auth_method]"));
        assert!(raw.contains("type = \"api_token\""));
        assert!(raw.contains("provider = \"gitlab\""));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("config.toml"));
        store.save(&sample_settings(ProviderKind::Github)).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn resave_tightens_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = SettingsStore::new(path);
        let settings = sample_settings(ProviderKind::Github);
        store.save(&settings).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn parses_hand_written_file() {
        let raw = r#"
[jira]
url = "https://jira.example.com/"
email = "dev@example.com"
project_key = "WAB"

[jira.auth_method]
type = "personal_access_token"
token = "abc"

[git]
provider = "github"
base_url = "https://api.github.com"
token = "ghp"
owner = "acme"
repo = "widgets"
"#;
        let settings: Settings = toml::from_str(raw).unwrap();
        assert_eq!(settings.tracker_url(), "https://jira.example.com");
        assert_eq!(
            settings.jira.auth_method,
            AuthMethod::PersonalAccessToken {
                token: "abc".to_string()
            }
        );
        assert_eq!(settings.preferences.branch_prefix(), "feat");
        assert_eq!(settings.preferences.default_transition(), None);
        assert_eq!(settings.jira.api_version(), "latest");
    }

    #[test]
    fn unparseable_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not = [valid").unwrap();
        let store = SettingsStore::new(path);
        assert!(matches!(
            store.load(),
            Err(AppError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn sets_known_keys() {
        let mut settings = sample_settings(ProviderKind::Gitlab);
        settings.set("jira.email", "new@example.com").unwrap();
        settings.set("jira.token", "fresh").unwrap();
        settings.set("jira.auth_method", "personal_access_token").unwrap();
        settings.set("git.provider", "GitHub").unwrap();
        settings.set("git.owner", "").unwrap();
        settings.set("preferences.branch_prefix", "fix").unwrap();

        assert_eq!(settings.jira.email, "new@example.com");
        assert_eq!(
            settings.jira.auth_method,
            AuthMethod::PersonalAccessToken {
                token: "fresh".to_string()
            }
        );
        assert_eq!(settings.git.provider, ProviderKind::Github);
        assert_eq!(settings.git.owner, None);
        assert_eq!(settings.preferences.branch_prefix(), "fix");
    }

    #[test]
    fn rejects_malformed_keys() {
        let mut settings = sample_settings(ProviderKind::Gitlab);
        for (key, value) in [
            ("jira", "x"),
            ("jira.colour", "x"),
            ("nope.url", "x"),
            ("git.provider", "bitbucket"),
            ("jira.auth_method", "oauth"),
        ] {
            assert!(
                matches!(
                    settings.set(key, value),
                    Err(AppError::ConfigurationInvalid(_))
                ),
                "{key} should be rejected"
            );
        }
        assert_eq!(settings, sample_settings(ProviderKind::Gitlab));
    }

    #[test]
    fn branch_prefix_must_be_a_single_segment() {
        let mut settings = sample_settings(ProviderKind::Gitlab);
        for prefix in ["feature/team", "", "  ", "my fix"] {
            assert!(
                matches!(
                    settings.set("preferences.branch_prefix", prefix),
                    Err(AppError::ConfigurationInvalid(_))
                ),
                "{prefix:?} should be rejected"
            );
        }
        assert_eq!(settings.preferences.branch_prefix(), "feat");

        settings.set("preferences.branch_prefix", " bugfix ").unwrap();
        assert_eq!(settings.preferences.branch_prefix(), "bugfix");
    }

    #[test]
    fn github_target_requires_owner_and_repo() {
        let mut settings = sample_settings(ProviderKind::Github);
        assert!(matches!(
            settings.code_host_target().unwrap(),
            CodeHostTarget::GitHub { .. }
        ));

        settings.git.repo = None;
        assert!(matches!(
            settings.code_host_target(),
            Err(AppError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn gitlab_target_needs_no_owner() {
        let mut settings = sample_settings(ProviderKind::Gitlab);
        settings.git.owner = None;
        settings.git.project_path = Some("team/widgets".to_string());
        assert_eq!(
            settings.code_host_target().unwrap(),
            CodeHostTarget::GitLab {
                base_url: "https://git.example.com".to_string(),
                token: "git-token".to_string(),
                project_path: Some("team/widgets".to_string()),
            }
        );
    }

    #[test]
    fn gitlab_project_defaults_to_repository_name() {
        let mut settings = sample_settings(ProviderKind::Gitlab);
        let root = PathBuf::from("/work/widgets");
        let target = settings
            .code_host_target()
            .unwrap()
            .with_default_project(Some(&root));
        assert!(matches!(
            target,
            CodeHostTarget::GitLab { project_path: Some(ref path), .. } if path == "widgets"
        ));

        settings.git.project_path = Some("team/widgets".to_string());
        let target = settings
            .code_host_target()
            .unwrap()
            .with_default_project(Some(&root));
        assert!(matches!(
            target,
            CodeHostTarget::GitLab { project_path: Some(ref path), .. } if path == "team/widgets"
        ));
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret(""), "<not set>");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret("abcd123456wxyz"), "abcd***wxyz");
    }
}
