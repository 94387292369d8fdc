//! Core type definitions for shipit deployments

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::EnvNames;
use crate::{Result, ShipError};

/// Everything one deployment needs to know about where it goes
///
/// Built once per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    work_dir: PathBuf,
    push_url: String,
    api_key: Option<String>,
    group_id: Option<String>,
}

impl DeploymentTarget {
    pub fn new(work_dir: impl Into<PathBuf>, push_url: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            push_url: push_url.into(),
            api_key: None,
            group_id: None,
        }
    }

    /// Attach apps API credentials used for link activation
    pub fn with_links(mut self, api_key: impl Into<String>, group_id: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.group_id = Some(group_id.into());
        self
    }

    /// Read the target from the process environment
    pub fn from_env(work_dir: impl Into<PathBuf>, names: &EnvNames) -> Result<Self> {
        Self::from_lookup(work_dir, names, |key| std::env::var(key).ok())
    }

    /// Read the target through an arbitrary variable lookup
    ///
    /// Empty or whitespace-only values count as absent.
    pub fn from_lookup<F>(work_dir: impl Into<PathBuf>, names: &EnvNames, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let push_url = read(&names.push_url).ok_or_else(|| {
            ShipError::Config(format!("{} is not set; nothing to push to", names.push_url))
        })?;

        Ok(Self {
            work_dir: work_dir.into(),
            push_url,
            api_key: read(&names.api_key),
            group_id: read(&names.group_id),
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// API key and group id, only when both are configured
    pub fn link_credentials(&self) -> Option<LinkCredentials<'_>> {
        match (self.api_key.as_deref(), self.group_id.as_deref()) {
            (Some(api_key), Some(group_id)) => Some(LinkCredentials { api_key, group_id }),
            _ => None,
        }
    }
}

/// Borrowed apps API credentials of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCredentials<'a> {
    pub api_key: &'a str,
    pub group_id: &'a str,
}

/// The single result returned to the caller of a deployment
///
/// Serializes as `{"success": true, "message": ...}` or
/// `{"success": false, "message": ..., "error": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl DeploymentOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: true,
        }
    }
}

impl std::fmt::Display for DeploymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_target_from_lookup() {
        let target = DeploymentTarget::from_lookup(
            "/work",
            &EnvNames::default(),
            lookup(&[
                ("GIT_PUSH_URL", "https://git.example/app.git"),
                ("REPO_NAME", "grp1"),
                ("LIVINGAPPS_API_KEY", "key"),
            ]),
        )
        .unwrap();

        assert_eq!(target.push_url(), "https://git.example/app.git");
        let creds = target.link_credentials().unwrap();
        assert_eq!(creds.group_id, "grp1");
        assert_eq!(creds.api_key, "key");
    }

    #[test]
    fn test_missing_push_url_is_config_error() {
        let err = DeploymentTarget::from_lookup("/work", &EnvNames::default(), lookup(&[]))
            .unwrap_err();
        assert!(matches!(err, ShipError::Config(_)));
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let target = DeploymentTarget::from_lookup(
            "/work",
            &EnvNames::default(),
            lookup(&[
                ("GIT_PUSH_URL", "https://git.example/app.git"),
                ("REPO_NAME", "grp1"),
                ("LIVINGAPPS_API_KEY", "  "),
            ]),
        )
        .unwrap();

        assert_eq!(target.api_key(), None);
        assert!(target.link_credentials().is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = serde_json::to_value(DeploymentOutcome::success("done")).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "message": "done"}));

        let failed = serde_json::to_value(DeploymentOutcome::failure("boom")).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({"success": false, "message": "boom", "error": true})
        );
    }
}
