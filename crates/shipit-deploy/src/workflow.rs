//! Deploy workflow: publish, wait for the dashboard, activate links

use chrono::{DateTime, Utc};
use shipit_apps::{
    ActivationReport, AppsApi, DashboardPoller, HttpClient, LinkActivator, PollOutcome,
    ReqwestClient, RetryPolicy,
};
use shipit_core::{DeploymentOutcome, DeploymentTarget, LinkCredentials, ShipConfig};
use shipit_git::{GitCommand, GitExecutor, PublishSummary, RepositoryPublisher};
use std::path::PathBuf;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

const MSG_PUSHED: &str = "Deployment successful! Code was pushed.";
const MSG_LINKED: &str = "Deployment successful! Code was pushed and dashboard links were added.";
const MSG_NOT_LINKED: &str = "Deployment successful! Dashboard links could not be activated.";
const MSG_NO_APPS: &str = "Deployment successful! The app group has no apps to link.";

/// What happened after the push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStage {
    /// Publishing failed, later stages never ran
    NotAttempted,
    /// API key or group id missing: publish-only deployment
    Skipped,
    /// The dashboard never answered 200 within the poll budget
    DashboardUnavailable { dashboard_url: String, attempts: u32 },
    /// The app group lookup failed; nothing was linked
    GroupFetchFailed { dashboard_url: String, error: String },
    /// Links were written (possibly partially, see the report)
    Activated(ActivationReport),
}

/// Full record of one workflow run
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: DeploymentOutcome,
    /// Present when the push succeeded
    pub publish: Option<PublishSummary>,
    pub links: LinkStage,
}

/// Runs a deployment through its three stages
pub struct DeployWorkflow<E: GitExecutor, H: HttpClient + Clone> {
    config: ShipConfig,
    publisher: RepositoryPublisher<E>,
    http: H,
}

impl DeployWorkflow<GitCommand, ReqwestClient> {
    /// Workflow driving the real `git` binary in `work_dir` and the HTTP stack
    ///
    /// The push URL and link credentials come from the target given to
    /// [`DeployWorkflow::run`].
    pub fn new(config: ShipConfig, work_dir: impl Into<PathBuf>) -> Self {
        let executor = GitCommand::new(work_dir);
        Self::with_executor(config, executor, ReqwestClient::new())
    }
}

impl<E: GitExecutor, H: HttpClient + Clone> DeployWorkflow<E, H> {
    /// Create a workflow with custom git and HTTP capabilities
    pub fn with_executor(config: ShipConfig, executor: E, http: H) -> Self {
        let publisher = RepositoryPublisher::new(executor, config.git.clone());
        Self {
            config,
            publisher,
            http,
        }
    }

    /// Run the deployment to completion
    ///
    /// Never returns an error: every failure is folded into the report.
    pub async fn run(&self, target: &DeploymentTarget) -> DeploymentReport {
        let id = Uuid::new_v4();
        let span = info_span!("deploy", %id);

        async move {
            let started_at = Utc::now();
            let (outcome, publish, links) = self.run_stages(target).await;

            if outcome.success {
                info!("{}", outcome.message);
            } else {
                error!("{}", outcome.message);
            }

            DeploymentReport {
                id,
                started_at,
                finished_at: Utc::now(),
                outcome,
                publish,
                links,
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        target: &DeploymentTarget,
    ) -> (DeploymentOutcome, Option<PublishSummary>, LinkStage) {
        // Stage 1: publish. The only stage allowed to fail the deployment.
        let summary = match self.publisher.publish(target.push_url()).await {
            Ok(summary) => summary,
            Err(e) => {
                return (
                    DeploymentOutcome::failure(format!("Deployment failed: {}", e)),
                    None,
                    LinkStage::NotAttempted,
                );
            }
        };

        let Some(credentials) = target.link_credentials() else {
            info!("No API key or app group configured, skipping dashboard links");
            return (
                DeploymentOutcome::success(MSG_PUSHED),
                Some(summary),
                LinkStage::Skipped,
            );
        };

        let links = self.link_dashboard(credentials).await;
        (outcome_for(&links), Some(summary), links)
    }

    /// Stages 2 and 3
    async fn link_dashboard(&self, credentials: LinkCredentials<'_>) -> LinkStage {
        let dashboard_url = self.config.apps.dashboard_url(credentials.group_id);

        let poller = DashboardPoller::new(self.http.clone(), RetryPolicy::from(&self.config.poll));
        if let PollOutcome::TimedOut { attempts } = poller.wait_until_ready(&dashboard_url).await {
            return LinkStage::DashboardUnavailable {
                dashboard_url,
                attempts,
            };
        }

        let api = AppsApi::new(self.http.clone(), &self.config.apps, credentials.api_key);
        let activator = LinkActivator::new(api, self.config.apps.link_title.as_str());

        match activator.activate(credentials.group_id, &dashboard_url).await {
            Ok(report) => LinkStage::Activated(report),
            Err(e) => {
                warn!("Failed to add dashboard links: {}", e);
                LinkStage::GroupFetchFailed {
                    dashboard_url,
                    error: e.to_string(),
                }
            }
        }
    }
}

fn outcome_for(links: &LinkStage) -> DeploymentOutcome {
    match links {
        LinkStage::NotAttempted | LinkStage::Skipped => DeploymentOutcome::success(MSG_PUSHED),
        LinkStage::DashboardUnavailable { .. } => DeploymentOutcome::success(MSG_NOT_LINKED),
        LinkStage::GroupFetchFailed { error, .. } => DeploymentOutcome::success(format!(
            "Deployment successful! Code was pushed, but dashboard links could not be activated: {}",
            error
        )),
        LinkStage::Activated(report) if report.is_empty() => {
            DeploymentOutcome::success(MSG_NO_APPS)
        }
        LinkStage::Activated(report) => {
            let failed = report.failed();
            if failed.is_empty() {
                DeploymentOutcome::success(MSG_LINKED)
            } else {
                let details: Vec<String> = failed
                    .iter()
                    .map(|(app, e)| format!("{} ({})", app, e))
                    .collect();
                DeploymentOutcome::success(format!(
                    "Deployment successful! Code was pushed; dashboard links were added to {} of {} apps. Failed: {}",
                    report.activated().len(),
                    report.results.len(),
                    details.join(", ")
                ))
            }
        }
    }
}
