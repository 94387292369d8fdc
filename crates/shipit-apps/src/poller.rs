//! Dashboard availability poller
//!
//! After a push the dashboard is rebuilt remotely, which takes anywhere from
//! seconds to minutes. The poller probes it at a fixed interval until it
//! answers 200 or the attempt budget is spent.

use shipit_core::PollSettings;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

/// Bounded, fixed-interval probe policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of probes, at least 1
    pub max_attempts: u32,
    /// Delay between two probes
    pub interval: Duration,
    /// Timeout of a single probe
    pub probe_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for RetryPolicy {
    fn from(settings: &PollSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            interval: Duration::from_secs(settings.interval_secs),
            probe_timeout: Duration::from_secs(settings.probe_timeout_secs),
        }
    }
}

/// How a wait for the dashboard ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The dashboard answered 200 on probe number `attempts`
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

/// Waits for a dashboard URL to come online
pub struct DashboardPoller<H: HttpClient> {
    http: H,
    policy: RetryPolicy,
}

impl<H: HttpClient> DashboardPoller<H> {
    pub fn new(http: H, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// Probe `url` until it returns 200 or the budget runs out
    ///
    /// Transport errors and non-200 statuses both mean "not ready yet".
    /// There is no sleep after the last probe.
    pub async fn wait_until_ready(&self, url: &str) -> PollOutcome {
        info!("Waiting for dashboard: {}", url);
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.http.get(url, &[], self.policy.probe_timeout).await {
                Ok(response) if response.status == 200 => {
                    info!("Dashboard is available after {} probe(s)", attempt);
                    return PollOutcome::Ready { attempts: attempt };
                }
                Ok(response) => debug!("Probe {}: HTTP {}", attempt, response.status),
                Err(e) => debug!("Probe {}: {}", attempt, e),
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        warn!("Timeout - dashboard not reachable after {} probes", max_attempts);
        PollOutcome::TimedOut {
            attempts: max_attempts,
        }
    }
}
