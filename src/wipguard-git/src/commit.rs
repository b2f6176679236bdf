//! Committing the working set after a passing test run.

use crate::command::{git_stdout, git_timeout, has_head, uncommitted_files};

use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, info};
use wipguard_core::{ChangeListModifications, CommitSink, TcrAction};

const FALLBACK_MESSAGE: &str = "tcr";

/// Stages everything uncommitted and commits it, optionally amending or
/// pushing. Hooks are skipped: the passing test run is the gate.
pub struct GitCommitAction {
    repo: PathBuf,
    include_untracked: bool,
    message: Option<String>,
    timeout: Duration,
}

impl GitCommitAction {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            include_untracked: true,
            message: None,
            timeout: git_timeout(),
        }
    }

    pub fn include_untracked(mut self, include_untracked: bool) -> Self {
        self.include_untracked = include_untracked;
        self
    }

    /// A blank message means the last commit's message is reused.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = (!message.trim().is_empty()).then_some(message);
        self
    }

    /// Modification stamp of every uncommitted file.
    pub fn modifications(&self) -> crate::Result<ChangeListModifications> {
        let files = uncommitted_files(&self.repo, self.include_untracked, self.timeout)?;
        Ok(files
            .into_iter()
            .map(|path| {
                let stamp = modification_stamp(&self.repo.join(&path));
                (path, stamp)
            })
            .collect())
    }

    pub fn commit_with(&self, action: TcrAction) -> crate::Result<()> {
        if action == TcrAction::AllowCommit {
            return Ok(());
        }
        let stage = if self.include_untracked { "--all" } else { "--update" };
        git_stdout(&["add", stage], &self.repo, self.timeout)?;

        let amend = action == TcrAction::AmendCommit && has_head(&self.repo, self.timeout)?;
        if amend {
            git_stdout(
                &["commit", "--quiet", "--no-verify", "--amend", "--no-edit"],
                &self.repo,
                self.timeout,
            )?;
        } else {
            let message = self.commit_message()?;
            git_stdout(
                &["commit", "--quiet", "--no-verify", "-m", &message],
                &self.repo,
                self.timeout,
            )?;
        }

        if action == TcrAction::CommitAndPush {
            git_stdout(&["push", "--quiet"], &self.repo, self.timeout)?;
        }
        info!(%action, amend, repo = %self.repo.display(), "Committed working set");
        Ok(())
    }

    fn commit_message(&self) -> crate::Result<String> {
        if let Some(message) = &self.message {
            return Ok(message.clone());
        }
        if has_head(&self.repo, self.timeout)? {
            let last = git_stdout(&["log", "-1", "--format=%B"], &self.repo, self.timeout)?;
            let last = last.trim();
            if !last.is_empty() {
                debug!("Reusing last commit message");
                return Ok(last.to_string());
            }
        }
        Ok(FALLBACK_MESSAGE.to_string())
    }
}

/// Mtime in microseconds; 0 for deleted files.
fn modification_stamp(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .and_then(|since| u64::try_from(since.as_micros()).ok())
        .unwrap_or(0)
}

impl CommitSink for GitCommitAction {
    fn change_list_modifications(&self) -> wipguard_core::Result<ChangeListModifications> {
        Ok(self.modifications()?)
    }

    fn commit(&self, action: TcrAction) -> wipguard_core::Result<()> {
        Ok(self.commit_with(action)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_has_zero_stamp() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(modification_stamp(&dir.path().join("gone.txt")), 0);

        std::fs::write(dir.path().join("here.txt"), "x").unwrap();
        assert!(modification_stamp(&dir.path().join("here.txt")) > 0);
    }

    #[test]
    fn test_blank_message_is_ignored() {
        let action = GitCommitAction::new("/tmp").message("  ");
        assert_eq!(action.message, None);

        let action = GitCommitAction::new("/tmp").message("wip");
        assert_eq!(action.message.as_deref(), Some("wip"));
    }
}
