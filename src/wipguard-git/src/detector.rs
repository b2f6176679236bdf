//! Commit and rollback detection by polling the repository.

use crate::command::{git_timeout, head_commit, last_reflog_subject, uncommitted_files};

use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use wipguard_core::CheckinOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoEvent {
    /// A commit moved HEAD; carries how much is still uncommitted.
    Committed(CheckinOutcome),
    /// The working set became clean without HEAD moving.
    RolledBack,
}

pub struct GitCommitDetector {
    repo: PathBuf,
    include_untracked: bool,
    timeout: Duration,
    head: Option<String>,
    had_changes: bool,
}

impl GitCommitDetector {
    /// Records the current HEAD and working set as the baseline.
    pub fn new(repo: impl Into<PathBuf>, include_untracked: bool) -> crate::Result<Self> {
        let repo = repo.into();
        let timeout = git_timeout();
        let head = head_commit(&repo, timeout)?;
        let had_changes = !uncommitted_files(&repo, include_untracked, timeout)?.is_empty();
        Ok(Self {
            repo,
            include_untracked,
            timeout,
            head,
            had_changes,
        })
    }

    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Compare against the previous poll.
    ///
    /// HEAD moving counts as a commit only when the newest reflog entry was
    /// written by `git commit`. Checkouts, resets, pulls and rebases just
    /// update the recorded HEAD.
    pub fn poll(&mut self) -> crate::Result<Option<RepoEvent>> {
        let head = head_commit(&self.repo, self.timeout)?;
        let remaining = uncommitted_files(&self.repo, self.include_untracked, self.timeout)?.len();
        let had_changes = std::mem::replace(&mut self.had_changes, remaining > 0);

        if head != self.head {
            let subject = last_reflog_subject(&self.repo, self.timeout)?;
            debug!(from = ?self.head, to = ?head, ?subject, remaining, "HEAD moved");
            self.head = head;
            if subject.as_deref().is_none_or(is_commit_subject) {
                return Ok(Some(RepoEvent::Committed(CheckinOutcome::new(remaining))));
            }
        }
        if had_changes && remaining == 0 {
            return Ok(Some(RepoEvent::RolledBack));
        }
        Ok(None)
    }
}

/// `commit: ...`, `commit (initial): ...`, `commit (amend): ...` and
/// `commit (merge): ...` are all written by `git commit`.
fn is_commit_subject(subject: &str) -> bool {
    subject.starts_with("commit:") || subject.starts_with("commit (")
}
