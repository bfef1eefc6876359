use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "release_tool.toml";

/// Prefix of every environment variable that overrides a config field.
pub const ENV_PREFIX: &str = "RELEASE_TOOL";

/// Represents the complete configuration for release-tool.
///
/// Read once at startup and never mutated afterwards; every workflow
/// component borrows it immutably.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JiraConfig {
    #[serde(default)]
    pub connection: JiraConnection,

    #[serde(default)]
    pub release_task: ReleaseTaskConfig,

    #[serde(default)]
    pub transition: TransitionConfig,
}

/// Credentials for the issue tracker.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JiraConnection {
    #[serde(default)]
    pub server: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub token: String,
}

impl JiraConnection {
    /// Server URL with a scheme, `https://` is assumed when none is given.
    pub fn server_url(&self) -> String {
        let server = self.server.trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            server.to_string()
        } else {
            format!("https://{}", server)
        }
    }
}

fn default_release_task_name() -> String {
    "{component} release {version}".to_string()
}

fn default_link_type() -> String {
    "parent of".to_string()
}

fn default_issue_type() -> String {
    "Task".to_string()
}

/// How the release task is named, typed and linked to its children.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReleaseTaskConfig {
    #[serde(default)]
    pub project: String,

    #[serde(default)]
    pub component: String,

    /// Summary template, `{component}` and `{version}` are interpolated.
    #[serde(default = "default_release_task_name")]
    pub name: String,

    #[serde(default = "default_link_type")]
    pub link_type: String,

    #[serde(rename = "type", default = "default_issue_type")]
    pub issue_type: String,
}

impl Default for ReleaseTaskConfig {
    fn default() -> Self {
        ReleaseTaskConfig {
            project: String::new(),
            component: String::new(),
            name: default_release_task_name(),
            link_type: default_link_type(),
            issue_type: default_issue_type(),
        }
    }
}

impl ReleaseTaskConfig {
    /// Formats the release task summary for a version.
    pub fn summary(&self, version: &semver::Version) -> String {
        self.name
            .replace("{component}", &self.component)
            .replace("{project}", &self.project)
            .replace("{version}", &version.to_string())
    }
}

fn default_child_from_status() -> String {
    "To Deploy".to_string()
}

fn default_child_to_status() -> String {
    "Done".to_string()
}

fn default_child_final_statuses() -> Vec<String> {
    vec!["Done".to_string(), "Closed".to_string()]
}

fn default_child_task_types_to_skip() -> Vec<String> {
    vec!["Story".to_string()]
}

fn default_release_from_status() -> String {
    "On Production".to_string()
}

fn default_release_to_status() -> String {
    "Release Merged".to_string()
}

/// Status names used when finishing a release.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransitionConfig {
    #[serde(default = "default_child_from_status")]
    pub child_from_status: String,

    #[serde(default = "default_child_to_status")]
    pub child_to_status: String,

    /// Child statuses that count as finished when releasing a tracker version.
    #[serde(default = "default_child_final_statuses")]
    pub child_final_statuses: Vec<String>,

    /// Child issue types ignored by the tracker version completion check.
    #[serde(default = "default_child_task_types_to_skip")]
    pub child_task_types_to_skip: Vec<String>,

    #[serde(default = "default_release_from_status")]
    pub release_from_status: String,

    #[serde(default = "default_release_to_status")]
    pub release_to_status: String,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        TransitionConfig {
            child_from_status: default_child_from_status(),
            child_to_status: default_child_to_status(),
            child_final_statuses: default_child_final_statuses(),
            child_task_types_to_skip: default_child_task_types_to_skip(),
            release_from_status: default_release_from_status(),
            release_to_status: default_release_to_status(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Code host access and the task key pattern applied to commits and PR titles.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub task_re: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            token: String::new(),
            task_re: String::new(),
            api_url: default_api_url(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_base() -> String {
    "develop".to_string()
}

fn default_master() -> String {
    "master".to_string()
}

fn default_release_name() -> String {
    "release-{version}".to_string()
}

/// Branch names of the develop/master/release workflow.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Integration branch release branches are cut from.
    #[serde(default = "default_base")]
    pub base: String,

    /// Stable branch hotfixes are cut from and releases are merged into.
    #[serde(default = "default_master")]
    pub master: String,

    #[serde(default = "default_release_name")]
    pub release_name: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            remote: default_remote(),
            base: default_base(),
            master: default_master(),
            release_name: default_release_name(),
        }
    }
}

/// Shell command templates supplied by the project being released.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HooksConfig {
    /// Prints the currently deployed version on stdout.
    #[serde(default)]
    pub get_version: String,

    /// Writes `{version}` into the project's versioned files.
    #[serde(default)]
    pub set_version: String,
}

fn default_link_workers() -> usize {
    5
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkflowConfig {
    /// Upper bound of concurrent child link requests.
    #[serde(default = "default_link_workers")]
    pub link_workers: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            link_workers: default_link_workers(),
        }
    }
}

fn require<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(ReleaseError::missing(format!(
            "`{}` is not configured (set it in {} or via {}_{})",
            name,
            DEFAULT_CONFIG_FILE,
            ENV_PREFIX,
            name.replace('.', "_").to_uppercase()
        )))
    } else {
        Ok(value)
    }
}

impl Config {
    /// Checks the fields needed to talk to the issue tracker.
    pub fn validate_jira(&self) -> Result<()> {
        require(&self.jira.connection.server, "jira.server")?;
        require(&self.jira.connection.user, "jira.user")?;
        require(&self.jira.connection.token, "jira.token")?;
        require(&self.jira.release_task.project, "jira.project")?;
        Ok(())
    }

    /// Checks the fields needed to talk to the code host.
    pub fn validate_github(&self) -> Result<()> {
        require(&self.github.token, "github.token")?;
        require(&self.github.task_re, "github.task_re")?;
        Ok(())
    }

    pub fn get_version_hook(&self) -> Result<&str> {
        require(&self.hooks.get_version, "hooks.get_version")
    }

    pub fn set_version_hook(&self) -> Result<&str> {
        require(&self.hooks.set_version, "hooks.set_version")
    }

    /// Applies `RELEASE_TOOL_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Variables are named `RELEASE_TOOL_<SECTION>_<FIELD>`; list fields take a
    /// comma separated value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

        let strings: [(&str, &mut String); 19] = [
            ("JIRA_SERVER", &mut self.jira.connection.server),
            ("JIRA_USER", &mut self.jira.connection.user),
            ("JIRA_TOKEN", &mut self.jira.connection.token),
            ("JIRA_PROJECT", &mut self.jira.release_task.project),
            ("JIRA_COMPONENT", &mut self.jira.release_task.component),
            ("JIRA_NAME", &mut self.jira.release_task.name),
            ("JIRA_LINK_TYPE", &mut self.jira.release_task.link_type),
            ("JIRA_TYPE", &mut self.jira.release_task.issue_type),
            ("JIRA_CHILD_FROM_STATUS", &mut self.jira.transition.child_from_status),
            ("JIRA_CHILD_TO_STATUS", &mut self.jira.transition.child_to_status),
            ("JIRA_RELEASE_FROM_STATUS", &mut self.jira.transition.release_from_status),
            ("JIRA_RELEASE_TO_STATUS", &mut self.jira.transition.release_to_status),
            ("GITHUB_TOKEN", &mut self.github.token),
            ("GITHUB_TASK_RE", &mut self.github.task_re),
            ("GITHUB_API_URL", &mut self.github.api_url),
            ("GIT_REMOTE", &mut self.git.remote),
            ("GIT_BASE", &mut self.git.base),
            ("GIT_MASTER", &mut self.git.master),
            ("GIT_RELEASE_NAME", &mut self.git.release_name),
        ];
        for (name, field) in strings {
            if let Some(value) = var(name) {
                *field = value;
            }
        }

        let lists: [(&str, &mut Vec<String>); 2] = [
            (
                "JIRA_CHILD_FINAL_STATUSES",
                &mut self.jira.transition.child_final_statuses,
            ),
            (
                "JIRA_CHILD_TASK_TYPES_TO_SKIP",
                &mut self.jira.transition.child_task_types_to_skip,
            ),
        ];
        for (name, field) in lists {
            if let Some(value) = var(name) {
                *field = value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }

        if let Some(value) = var("HOOKS_GET_VERSION") {
            self.hooks.get_version = value;
        }
        if let Some(value) = var("HOOKS_SET_VERSION") {
            self.hooks.set_version = value;
        }
        if let Some(value) = var("WORKFLOW_LINK_WORKERS") {
            self.workflow.link_workers = value.trim().parse().map_err(|_| {
                ReleaseError::config(format!(
                    "{}_WORKFLOW_LINK_WORKERS must be a positive number, got '{}'",
                    ENV_PREFIX, value
                ))
            })?;
        }

        Ok(())
    }
}

/// Finds the config file to read, if any.
///
/// Order: explicit path, `./release_tool.toml`, then
/// `<config dir>/release-tool/config.toml`.
pub fn locate_config(config_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = config_path {
        return Some(PathBuf::from(path));
    }

    let local = Path::new(".").join(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("release-tool").join("config.toml"))
        .filter(|path| path.exists())
}

/// Loads configuration from file (or defaults) and applies environment overrides.
///
/// # Arguments
/// * `config_path` - Optional path to a custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If the file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let mut config = match locate_config(config_path) {
        Some(path) => {
            let content = fs::read_to_string(&path).map_err(|e| {
                ReleaseError::config(format!("Cannot read {}: {}", path.display(), e))
            })?;
            toml::from_str(&content).map_err(|e| {
                ReleaseError::config(format!("Cannot parse {}: {}", path.display(), e))
            })?
        }
        None => Config::default(),
    };

    config.apply_env()?;

    if config.workflow.link_workers == 0 {
        return Err(ReleaseError::config("workflow.link_workers must be at least 1"));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_follow_release_workflow() {
        let config = Config::default();
        assert_eq!(config.git.base, "develop");
        assert_eq!(config.git.master, "master");
        assert_eq!(config.git.release_name, "release-{version}");
        assert_eq!(config.jira.release_task.link_type, "parent of");
        assert_eq!(config.jira.transition.child_final_statuses, vec!["Done", "Closed"]);
        assert_eq!(config.workflow.link_workers, 5);
    }

    #[test]
    fn test_server_url_adds_scheme() {
        let mut connection = JiraConnection::default();
        connection.server = "jira.example.com/".to_string();
        assert_eq!(connection.server_url(), "https://jira.example.com");

        connection.server = "http://localhost:8080".to_string();
        assert_eq!(connection.server_url(), "http://localhost:8080");
    }

    #[test]
    fn test_release_task_summary() {
        let mut task = ReleaseTaskConfig::default();
        task.component = "Backend".to_string();
        let version = semver::Version::new(1, 3, 0);
        assert_eq!(task.summary(&version), "Backend release 1.3.0");
    }

    #[test]
    fn test_overrides_replace_fields_and_split_lists() {
        let vars: HashMap<&str, &str> = [
            ("RELEASE_TOOL_JIRA_TOKEN", "secret"),
            ("RELEASE_TOOL_GIT_BASE", "main"),
            ("RELEASE_TOOL_JIRA_CHILD_FINAL_STATUSES", "Done, Closed ,Won't Do"),
            ("RELEASE_TOOL_WORKFLOW_LINK_WORKERS", "2"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.jira.connection.token, "secret");
        assert_eq!(config.git.base, "main");
        assert_eq!(
            config.jira.transition.child_final_statuses,
            vec!["Done", "Closed", "Won't Do"]
        );
        assert_eq!(config.workflow.link_workers, 2);
        assert_eq!(config.git.master, "master");
    }

    #[test]
    fn test_invalid_worker_override_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|name| {
            (name == "RELEASE_TOOL_WORKFLOW_LINK_WORKERS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ReleaseError::Config(_))));
    }

    #[test]
    fn test_validation_names_missing_field() {
        let config = Config::default();
        let err = config.validate_jira().unwrap_err();
        assert!(err.to_string().contains("jira.server"));
        assert!(err.to_string().contains("RELEASE_TOOL_JIRA_SERVER"));

        let err = config.set_version_hook().unwrap_err();
        assert!(matches!(err, ReleaseError::MissingRequiredInput(_)));
    }
}
