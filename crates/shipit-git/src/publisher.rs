//! Repository publisher
//!
//! Turns a generated working tree into a commit on the remote branch without
//! ever rewriting the remote's history. When the remote already has commits,
//! its `.git` directory is grafted under the working tree first, so the new
//! content lands as one more commit on top.

use serde::{Deserialize, Serialize};
use shipit_core::fail_open::fail_open;
use shipit_core::{GitSettings, Result, ShipError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, instrument};

use crate::command::{redact_credentials, GitExecutor};

/// Where the published history came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrigin {
    /// Remote history was retrieved and extended
    Existing,
    /// Remote was absent or empty; a new repository was initialized
    Fresh,
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishSummary {
    pub history: HistoryOrigin,
    pub branch: String,
    /// Commit id of the pushed commit, if it could be read back
    pub commit: Option<String>,
}

/// A clone of the remote held in a scratch directory
///
/// The scratch directory is removed when this value is dropped.
#[derive(Debug)]
pub struct RetrievedHistory {
    _scratch: TempDir,
    git_dir: PathBuf,
}

impl RetrievedHistory {
    /// The retrieved `.git` directory
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }
}

/// Outcome of probing the remote
#[derive(Debug)]
pub enum RemoteHistory {
    Found(RetrievedHistory),
    /// Remote absent, unreachable or without commits
    NotFound { reason: String },
}

/// Publishes a working tree to a remote repository
pub struct RepositoryPublisher<E: GitExecutor> {
    executor: E,
    settings: GitSettings,
}

impl<E: GitExecutor> RepositoryPublisher<E> {
    pub fn new(executor: E, settings: GitSettings) -> Self {
        Self { executor, settings }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Commit the whole working tree and push it to `push_url`
    #[instrument(skip_all, fields(dir = %self.executor.work_dir().display()))]
    pub async fn publish(&self, push_url: &str) -> Result<PublishSummary> {
        info!("Checking whether the remote repository already exists");

        let history = match self.probe_remote(push_url).await? {
            RemoteHistory::Found(retrieved) => {
                self.adopt_history(&retrieved).await?;
                info!("Adopted history from existing remote repository");
                HistoryOrigin::Existing
            }
            RemoteHistory::NotFound { reason } => {
                debug!("Remote not usable ({}), initializing", reason);
                self.init_fresh(push_url).await?;
                info!("Initialized new repository");
                HistoryOrigin::Fresh
            }
        };

        self.commit_all().await?;
        self.push().await?;
        info!("Push to {} successful", self.settings.branch);

        let commit = fail_open("read pushed commit", || async {
            let output = self.executor.run(&["rev-parse", "HEAD"]).await?;
            Ok::<_, ShipError>(output.stdout.trim().to_string())
        })
        .await;

        Ok(PublishSummary {
            history,
            branch: self.settings.branch.clone(),
            commit,
        })
    }

    /// Clone the remote into a scratch directory to learn whether it has history
    ///
    /// A failing clone is an expected answer, not an error. Only a git
    /// binary that cannot be started is reported as `Err`.
    pub async fn probe_remote(&self, push_url: &str) -> Result<RemoteHistory> {
        let scratch = tempfile::Builder::new().prefix("shipit-remote-").tempdir()?;
        let target = scratch.path().join("repo");
        let target_str = target.to_string_lossy().to_string();

        let clone = self
            .executor
            .exec(&[
                "clone",
                "--quiet",
                "--origin",
                &self.settings.remote,
                push_url,
                &target_str,
            ])
            .await?;

        if !clone.success {
            return Ok(RemoteHistory::NotFound {
                reason: redact_credentials(clone.stderr.trim()),
            });
        }

        let git_dir = target.join(".git");
        if !git_dir.is_dir() {
            return Err(ShipError::Repository(format!(
                "clone of {} succeeded but produced no .git directory",
                redact_credentials(push_url)
            )));
        }

        let head = self
            .executor
            .exec(&["-C", &target_str, "rev-parse", "--verify", "--quiet", "HEAD"])
            .await?;
        if !head.success {
            return Ok(RemoteHistory::NotFound {
                reason: "remote repository has no commits".to_string(),
            });
        }

        Ok(RemoteHistory::Found(RetrievedHistory {
            _scratch: scratch,
            git_dir,
        }))
    }

    /// Replace the local `.git` with the retrieved one and move onto the target branch
    pub async fn adopt_history(&self, retrieved: &RetrievedHistory) -> Result<()> {
        let local_git = self.executor.work_dir().join(".git");
        let source = retrieved.git_dir().to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<()> {
            remove_git_dir(&local_git)?;
            copy_dir_recursive(&source, &local_git)
        })
        .await
        .map_err(|e| ShipError::Other(format!("History copy task failed: {}", e)))??;

        let current = self
            .executor
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        if current.stdout.trim() != self.settings.branch {
            self.switch_to_branch().await?;
        }

        Ok(())
    }

    /// Move HEAD onto the target branch, keeping the working tree as is
    ///
    /// When the remote already has the branch, local history continues from
    /// it so the push stays a fast-forward. Otherwise the branch starts at
    /// the remote's default HEAD.
    async fn switch_to_branch(&self) -> Result<()> {
        let branch = &self.settings.branch;
        let tracking_ref = format!("refs/remotes/{}/{}", self.settings.remote, branch);
        let tracking = self
            .executor
            .exec(&["rev-parse", "--verify", "--quiet", &tracking_ref])
            .await?;

        if tracking.success {
            debug!("Continuing from {}", tracking_ref);
            let local_ref = format!("refs/heads/{}", branch);
            self.executor
                .run(&["update-ref", &local_ref, &tracking_ref])
                .await?;
            self.executor
                .run(&["symbolic-ref", "HEAD", &local_ref])
                .await?;
            self.executor.run(&["reset", "-q"]).await?;
        } else {
            self.executor.run(&["checkout", "-B", branch]).await?;
        }
        Ok(())
    }

    /// Start a new repository with the target branch and the remote registered
    pub async fn init_fresh(&self, push_url: &str) -> Result<()> {
        let local_git = self.executor.work_dir().join(".git");
        tokio::task::spawn_blocking(move || remove_git_dir(&local_git))
            .await
            .map_err(|e| ShipError::Other(format!("Cleanup task failed: {}", e)))??;

        self.executor.run(&["init"]).await?;
        self.executor
            .run(&["checkout", "-b", &self.settings.branch])
            .await?;
        self.executor
            .run(&["remote", "add", &self.settings.remote, push_url])
            .await?;
        Ok(())
    }

    /// Stage everything, deletions included, and commit with the configured identity
    pub async fn commit_all(&self) -> Result<()> {
        self.executor.run(&["add", "-A"]).await?;

        let name = format!("user.name={}", self.settings.author_name);
        let email = format!("user.email={}", self.settings.author_email);
        let mut args = vec![
            "-c",
            name.as_str(),
            "-c",
            email.as_str(),
            "commit",
            "-m",
            self.settings.commit_message.as_str(),
        ];
        if self.settings.allow_empty {
            args.push("--allow-empty");
        }

        self.executor.run(&args).await?;
        Ok(())
    }

    pub async fn push(&self) -> Result<()> {
        self.executor
            .run(&["push", &self.settings.remote, &self.settings.branch])
            .await?;
        Ok(())
    }
}

fn remove_git_dir(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path)?,
        Ok(_) => std::fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn copy_dir_recursive(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
