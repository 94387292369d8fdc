//! # shipit-apps
//!
//! Everything that talks to the apps platform after a push:
//! - `HttpClient` capability with a reqwest implementation and a recording mock
//! - `AppsApi` for app group lookups and app parameter updates
//! - `DashboardPoller`, a bounded wait for the dashboard to come online
//! - `LinkActivator`, the best-effort fan-out that links apps to the dashboard
//!
//! ## Key Pattern
//!
//! Nothing here may undo a successful push. Group lookup is the only call
//! whose failure is reported as an error; per-app updates are collected into
//! an [`ActivationReport`] instead.

mod api;
mod http;
mod links;
mod poller;

pub use api::{AppEntry, AppGroup, AppsApi};
pub use http::{HttpCall, HttpClient, HttpResponse, MockHttpClient, MockReply, ReqwestClient};
pub use links::{ActivationReport, AppLinkResult, DashboardLinkParams, LinkActivator};
pub use poller::{DashboardPoller, PollOutcome, RetryPolicy};
