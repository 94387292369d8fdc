//! Link activation
//!
//! Points every app of a group at the group's dashboard by writing two header
//! parameters per app. Updates are best-effort: one app failing never stops
//! the others.

use shipit_core::fail_open::{best_effort, ItemResult};
use shipit_core::{Result, ShipError};
use tracing::info;

use crate::api::AppsApi;
use crate::http::HttpClient;

/// Per-app result of an activation run
pub type AppLinkResult = ItemResult<String, ()>;

/// The two header parameters written to every app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardLinkParams {
    pub additional_url: String,
    pub additional_title: String,
}

impl DashboardLinkParams {
    pub const URL_PARAM: &'static str = "la_page_header_additional_url";
    pub const TITLE_PARAM: &'static str = "la_page_header_additional_title";

    pub fn new(additional_url: impl Into<String>, additional_title: impl Into<String>) -> Self {
        Self {
            additional_url: additional_url.into(),
            additional_title: additional_title.into(),
        }
    }

    /// `(parameter, description, value)` for each update
    pub fn updates(&self) -> [(&'static str, &'static str, &str); 2] {
        [
            (Self::URL_PARAM, "dashboard_url", self.additional_url.as_str()),
            (Self::TITLE_PARAM, "dashboard_title", self.additional_title.as_str()),
        ]
    }
}

/// What an activation run did, app by app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub dashboard_url: String,
    pub results: Vec<AppLinkResult>,
}

impl ActivationReport {
    pub fn activated(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.is_ok())
            .map(|r| r.item.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| match &r.result {
                Err(e) => Some((r.item.as_str(), e.as_str())),
                Ok(()) => None,
            })
            .collect()
    }

    /// The group had no apps, so nothing was linked
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Links the apps of a group to a dashboard
pub struct LinkActivator<H: HttpClient> {
    api: AppsApi<H>,
    title: String,
}

impl<H: HttpClient> LinkActivator<H> {
    pub fn new(api: AppsApi<H>, title: impl Into<String>) -> Self {
        Self {
            api,
            title: title.into(),
        }
    }

    /// Resolve `group_id` and write both link parameters to each member app
    ///
    /// Only the group lookup can fail this call. Per-app failures end up in
    /// the report.
    pub async fn activate(&self, group_id: &str, dashboard_url: &str) -> Result<ActivationReport> {
        let group = self.api.fetch_group(group_id).await?;
        let app_ids = group.app_ids();

        if app_ids.is_empty() {
            info!("No apps found in group {}", group_id);
            return Ok(ActivationReport {
                dashboard_url: dashboard_url.to_string(),
                results: Vec::new(),
            });
        }

        info!("Activating dashboard links for {} apps", app_ids.len());
        let params = DashboardLinkParams::new(dashboard_url, self.title.as_str());

        let results = best_effort("dashboard link", app_ids, |app_id| {
            let params = &params;
            async move {
                self.link_app(&app_id, params).await?;
                info!("  App {} activated", app_id);
                Ok::<_, ShipError>(())
            }
        })
        .await;

        Ok(ActivationReport {
            dashboard_url: dashboard_url.to_string(),
            results,
        })
    }

    /// Issue both parameter updates for one app, even if the first one fails
    async fn link_app(&self, app_id: &str, params: &DashboardLinkParams) -> Result<()> {
        let mut errors = Vec::new();
        for (param, description, value) in params.updates() {
            if let Err(e) = self
                .api
                .update_param(app_id, param, description, value)
                .await
            {
                errors.push(format!("{}: {}", param, e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ShipError::Other(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockHttpClient, MockReply};
    use shipit_core::AppsSettings;

    const BASE: &str = "https://my.living-apps.de/rest";
    const DASHBOARD: &str = "https://my.living-apps.de/github/grp1/";

    fn group_body(ids: &[&str]) -> String {
        let apps: serde_json::Map<String, serde_json::Value> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (format!("app{}", i), serde_json::json!({"id": id})))
            .collect();
        serde_json::json!({ "apps": apps }).to_string()
    }

    fn param_url(app: &str, param: &str) -> String {
        format!("{}/apps/{}/params/{}", BASE, app, param)
    }

    fn activator(mock: MockHttpClient) -> LinkActivator<MockHttpClient> {
        LinkActivator::new(AppsApi::new(mock, &AppsSettings::default(), "key"), "Dashboard")
    }

    fn all_params_ok(mut mock: MockHttpClient, apps: &[&str]) -> MockHttpClient {
        for app in apps {
            for param in [DashboardLinkParams::URL_PARAM, DashboardLinkParams::TITLE_PARAM] {
                mock = mock.on_put(&param_url(app, param), [MockReply::ok("")]);
            }
        }
        mock
    }

    #[tokio::test]
    async fn test_two_apps_get_four_updates() {
        let mock = MockHttpClient::new()
            .on_get(&format!("{}/appgroups/grp1", BASE), [MockReply::ok(group_body(&["A", "B"]))]);
        let mock = all_params_ok(mock, &["A", "B"]);
        let activator = activator(mock.clone());

        let report = activator.activate("grp1", DASHBOARD).await.unwrap();

        assert_eq!(report.activated(), vec!["A", "B"]);
        assert!(report.failed().is_empty());

        let puts = mock.calls_with_method("PUT");
        assert_eq!(puts.len(), 4);
        assert_eq!(puts[0].url, param_url("A", DashboardLinkParams::URL_PARAM));
        assert_eq!(
            puts[0].body.as_ref().unwrap()["value"],
            serde_json::json!(DASHBOARD)
        );
        assert_eq!(puts[1].url, param_url("A", DashboardLinkParams::TITLE_PARAM));
        assert_eq!(
            puts[1].body.as_ref().unwrap(),
            &serde_json::json!({
                "description": "dashboard_title",
                "type": "string",
                "value": "Dashboard",
            })
        );
        assert!(puts.iter().all(|p| p.header("X-API-Key") == Some("key")));
    }

    #[tokio::test]
    async fn test_failing_app_does_not_stop_the_rest() {
        let mock = MockHttpClient::new()
            .on_get(&format!("{}/appgroups/grp1", BASE), [MockReply::ok(group_body(&["A", "B"]))])
            .on_put(
                &param_url("A", DashboardLinkParams::URL_PARAM),
                [MockReply::Error("connection reset".to_string())],
            )
            .on_put(&param_url("A", DashboardLinkParams::TITLE_PARAM), [MockReply::ok("")]);
        let mock = all_params_ok(mock, &["B"]);
        let activator = activator(mock.clone());

        let report = activator.activate("grp1", DASHBOARD).await.unwrap();

        assert_eq!(report.activated(), vec!["B"]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "A");
        assert!(failed[0].1.contains("la_page_header_additional_url"));
        assert!(failed[0].1.contains("connection reset"));
        // A's title update still went out
        assert_eq!(mock.calls_with_method("PUT").len(), 4);
    }

    #[tokio::test]
    async fn test_empty_group_makes_no_updates() {
        let mock = MockHttpClient::new()
            .on_get(&format!("{}/appgroups/grp1", BASE), [MockReply::ok(r#"{"apps":{}}"#)]);
        let activator = activator(mock.clone());

        let report = activator.activate("grp1", DASHBOARD).await.unwrap();

        assert!(report.is_empty());
        assert!(mock.calls_with_method("PUT").is_empty());
    }

    #[tokio::test]
    async fn test_group_lookup_failure_is_an_error() {
        let mock = MockHttpClient::new()
            .on_get(&format!("{}/appgroups/grp1", BASE), [MockReply::status(404)]);
        let activator = activator(mock.clone());

        let err = activator.activate("grp1", DASHBOARD).await.unwrap_err();

        assert!(matches!(err, ShipError::HttpStatus { status: 404, .. }));
        assert!(mock.calls_with_method("PUT").is_empty());
    }
}
