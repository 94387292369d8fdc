//! # shipit-git
//!
//! Git integration layer for shipit deployments.
//!
//! This crate provides:
//! - Git command execution abstraction (real and mock executors)
//! - The repository publisher: graft remote history, commit, push

mod command;
mod publisher;

pub use command::{redact_credentials, CommandOutput, GitCommand, GitExecutor, MockGitExecutor};
pub use publisher::{
    HistoryOrigin, PublishSummary, RemoteHistory, RepositoryPublisher, RetrievedHistory,
};
