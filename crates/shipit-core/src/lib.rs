//! # shipit-core
//!
//! Core types for the shipit deploy-and-reconcile workflow.
//!
//! A deployment pushes a generated workspace to a remote git repository,
//! waits for the dashboard built from it to come online, then points every
//! app of the owning app group at that dashboard.
//!
//! ## Contents
//!
//! - [`DeploymentTarget`]: the immutable input bundle of one deployment
//! - [`DeploymentOutcome`]: the single result handed back to the caller
//! - [`ShipConfig`]: policy constants (identity, commit message, poll budget)
//! - [`ShipError`]: the unified error type
//! - [`fail_open`]: best-effort helpers for the non-critical stages

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{AppsSettings, EnvNames, GitSettings, PollSettings, ShipConfig};
pub use error::{Result, ShipError};
pub use types::*;
