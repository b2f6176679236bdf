//! Git collaborators for wipguard.
//!
//! Everything here shells out to the `git` binary and bounds each call with a
//! timeout, so the session actor never waits on git indefinitely.

mod command;
pub mod commit;
pub mod detector;
pub mod provider;
pub mod revert;
pub mod state;

pub use command::{git_available, is_git_repo, repo_root};
pub use commit::GitCommitAction;
pub use detector::{GitCommitDetector, RepoEvent};
pub use provider::GitChangeSizeProvider;
pub use revert::GitRevertAction;
pub use state::RepoState;

use thiserror::Error;
use wipguard_core::WipError;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotGitRepo(String),
    #[error("Git command failed: {0}")]
    GitFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Git command '{command}' timed out after {timeout_millis}ms")]
    GitTimeout { command: String, timeout_millis: u128 },
    #[error("Invalid state file: {0}")]
    StateParse(#[from] toml::de::Error),
    #[error("Failed to write state file: {0}")]
    StateWrite(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, GitError>;

impl From<GitError> for WipError {
    fn from(e: GitError) -> Self {
        match e {
            GitError::Io(e) => WipError::Io(e),
            other => WipError::Vcs(other.to_string()),
        }
    }
}
