//! Apps API client
//!
//! Covers the two endpoints a deployment needs: reading an app group and
//! writing a single app parameter.

use serde::{Deserialize, Serialize};
use shipit_core::{AppsSettings, Result, ShipError};
use std::time::Duration;

use crate::http::HttpClient;

// Error bodies are echoed into outcome messages; keep them readable
const MAX_ERROR_BODY: usize = 200;

/// An app group as returned by `GET /rest/appgroups/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppGroup {
    /// Member apps keyed by an identifier of the API's choosing, in the
    /// order the response lists them
    #[serde(default, with = "ordered_apps")]
    pub apps: Vec<(String, AppEntry)>,
}

/// One member app of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl AppGroup {
    /// Member app ids in the order the group lists them
    pub fn app_ids(&self) -> Vec<String> {
        self.apps.iter().map(|(_, app)| app.id.clone()).collect()
    }
}

/// The `apps` object as a list of entries, keeping document order
mod ordered_apps {
    use super::AppEntry;
    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(
        apps: &[(String, AppEntry)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(apps.iter().map(|(key, app)| (key, app)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, AppEntry)>, D::Error> {
        struct AppsVisitor;

        impl<'de> Visitor<'de> for AppsVisitor {
            type Value = Vec<(String, AppEntry)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of apps")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut apps = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, AppEntry>()? {
                    apps.push(entry);
                }
                Ok(apps)
            }
        }

        deserializer.deserialize_map(AppsVisitor)
    }
}

/// Client for the apps REST API
pub struct AppsApi<H: HttpClient> {
    http: H,
    base_url: String,
    api_key: String,
    fetch_timeout: Duration,
    update_timeout: Duration,
}

impl<H: HttpClient> AppsApi<H> {
    pub fn new(http: H, settings: &AppsSettings, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: settings.api_base(),
            api_key: api_key.into(),
            fetch_timeout: settings.fetch_timeout(),
            update_timeout: settings.update_timeout(),
        }
    }

    fn headers(&self) -> [(&str, &str); 3] {
        [
            ("X-API-Key", self.api_key.as_str()),
            ("Accept", "application/json"),
            ("Content-Type", "application/json"),
        ]
    }

    /// Fetch an app group; any non-2xx status is an error
    pub async fn fetch_group(&self, group_id: &str) -> Result<AppGroup> {
        let url = format!("{}/appgroups/{}", self.base_url, group_id);
        tracing::info!("Loading app group {}", group_id);

        let response = self
            .http
            .get(&url, &self.headers(), self.fetch_timeout)
            .await?;

        if !response.is_success() {
            return Err(ShipError::HttpStatus {
                url,
                status: response.status,
                body: truncate(&response.body),
            });
        }

        let group: AppGroup = serde_json::from_str(&response.body)?;
        tracing::info!("Found {} apps", group.apps.len());
        Ok(group)
    }

    /// Write one string parameter of an app
    pub async fn update_param(
        &self,
        app_id: &str,
        param: &str,
        description: &str,
        value: &str,
    ) -> Result<()> {
        let url = format!("{}/apps/{}/params/{}", self.base_url, app_id, param);
        let body = serde_json::json!({
            "description": description,
            "type": "string",
            "value": value,
        });

        let status = self
            .http
            .put_json(&url, &self.headers(), &body, self.update_timeout)
            .await?;

        if !(200..300).contains(&status) {
            return Err(ShipError::HttpStatus {
                url,
                status,
                body: String::new(),
            });
        }
        Ok(())
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
