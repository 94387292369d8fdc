//! # shipit-deploy
//!
//! The deploy-and-reconcile workflow.
//!
//! A run goes through three stages in strict order:
//! 1. publish the working tree (fatal on failure)
//! 2. wait for the dashboard (best-effort)
//! 3. link the group's apps to the dashboard (best-effort)
//!
//! Whatever happens, a run ends in exactly one [`DeploymentReport`] carrying
//! the caller-facing [`shipit_core::DeploymentOutcome`].

mod workflow;

pub use workflow::{DeployWorkflow, DeploymentReport, LinkStage};
