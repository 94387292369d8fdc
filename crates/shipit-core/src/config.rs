//! Configuration management for shipit
//!
//! Policy constants of a deployment live here instead of in the workflow:
//! the commit identity and message, the target branch, the dashboard poll
//! budget and the apps API endpoints. Every field has a default, so an empty
//! or missing config file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Result, ShipError};

/// Top-level shipit configuration
///
/// Usually loaded from a `shipit.toml` passed on the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipConfig {
    /// Git publishing policy
    #[serde(default)]
    pub git: GitSettings,

    /// Apps API endpoints and link values
    #[serde(default)]
    pub apps: AppsSettings,

    /// Dashboard poll budget
    #[serde(default)]
    pub poll: PollSettings,

    /// Names of the environment variables read at invocation
    #[serde(default)]
    pub env: EnvNames,
}

/// Git publishing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    /// Author name passed per commit (`-c user.name=...`)
    #[serde(default = "default_author_name")]
    pub author_name: String,

    /// Author email passed per commit (`-c user.email=...`)
    #[serde(default = "default_author_email")]
    pub author_email: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Branch that is committed to and pushed
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Remote name registered for fresh repositories
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Create a commit even when nothing changed, marking the deploy event
    #[serde(default = "default_true")]
    pub allow_empty: bool,
}

/// Apps API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsSettings {
    /// Base URL shared by the REST API (`/rest`) and dashboards (`/github/{id}/`)
    #[serde(default = "default_portal_url")]
    pub portal_url: String,

    /// Label written to `la_page_header_additional_title`
    #[serde(default = "default_link_title")]
    pub link_title: String,

    /// Timeout for the app group lookup
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Timeout for each parameter update
    #[serde(default = "default_update_timeout_secs")]
    pub update_timeout_secs: u64,
}

/// Dashboard poll budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between two probes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Per-probe request timeout
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

/// Environment variable names for the deployment inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvNames {
    #[serde(default = "default_push_url_var")]
    pub push_url: String,

    #[serde(default = "default_group_id_var")]
    pub group_id: String,

    #[serde(default = "default_api_key_var")]
    pub api_key: String,
}

// Default value providers
fn default_author_name() -> String {
    "Lilo".to_string()
}

fn default_author_email() -> String {
    "lilo@livinglogic.de".to_string()
}

fn default_commit_message() -> String {
    "Lilo Auto-Deploy".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_portal_url() -> String {
    "https://my.living-apps.de".to_string()
}

fn default_link_title() -> String {
    "Dashboard".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_update_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    180
}

fn default_interval_secs() -> u64 {
    1
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_push_url_var() -> String {
    "GIT_PUSH_URL".to_string()
}

fn default_group_id_var() -> String {
    "REPO_NAME".to_string()
}

fn default_api_key_var() -> String {
    "LIVINGAPPS_API_KEY".to_string()
}

impl ShipConfig {
    /// Load configuration from `path` or use defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = Self::default().to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ShipError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject values that would make a deployment meaningless
    pub fn validate(&self) -> Result<()> {
        if self.git.branch.trim().is_empty() {
            return Err(ShipError::Config("git.branch must not be empty".to_string()));
        }
        if self.git.remote.trim().is_empty() {
            return Err(ShipError::Config("git.remote must not be empty".to_string()));
        }
        if self.poll.max_attempts == 0 {
            return Err(ShipError::Config(
                "poll.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppsSettings {
    /// REST API base, e.g. `https://my.living-apps.de/rest`
    pub fn api_base(&self) -> String {
        format!("{}/rest", self.portal_url.trim_end_matches('/'))
    }

    /// Dashboard URL published for an app group
    pub fn dashboard_url(&self, group_id: &str) -> String {
        format!("{}/github/{}/", self.portal_url.trim_end_matches('/'), group_id)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_secs(self.update_timeout_secs)
    }
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
            commit_message: default_commit_message(),
            branch: default_branch(),
            remote: default_remote(),
            allow_empty: default_true(),
        }
    }
}

impl Default for AppsSettings {
    fn default() -> Self {
        Self {
            portal_url: default_portal_url(),
            link_title: default_link_title(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            update_timeout_secs: default_update_timeout_secs(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for EnvNames {
    fn default() -> Self {
        Self {
            push_url: default_push_url_var(),
            group_id: default_group_id_var(),
            api_key: default_api_key_var(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShipConfig::default();
        assert_eq!(config.git.branch, "main");
        assert_eq!(config.git.remote, "origin");
        assert!(config.git.allow_empty);
        assert_eq!(config.poll.max_attempts, 180);
        assert_eq!(config.poll.interval_secs, 1);
        assert_eq!(config.apps.link_title, "Dashboard");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: ShipConfig = toml::from_str(
            r#"
            [git]
            commit_message = "Release"

            [poll]
            max_attempts = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.git.commit_message, "Release");
        assert_eq!(config.git.author_name, "Lilo");
        assert_eq!(config.poll.max_attempts, 10);
        assert_eq!(config.poll.probe_timeout_secs, 5);
        assert_eq!(config.env.push_url, "GIT_PUSH_URL");
    }

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let apps = AppsSettings {
            portal_url: "https://portal.example/".to_string(),
            ..AppsSettings::default()
        };
        assert_eq!(apps.api_base(), "https://portal.example/rest");
        assert_eq!(
            apps.dashboard_url("grp1"),
            "https://portal.example/github/grp1/"
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShipConfig::load_or_default(&dir.path().join("shipit.toml")).unwrap();
        assert_eq!(config.git.branch, "main");
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/shipit.toml");
        ShipConfig::write_default(&path).unwrap();

        let config = ShipConfig::load_or_default(&path).unwrap();
        assert_eq!(config.apps.portal_url, "https://my.living-apps.de");
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shipit.toml");
        std::fs::write(&path, "[poll]\nmax_attempts = 0\n").unwrap();

        let err = ShipConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, ShipError::Config(_)));
    }
}
