//! Discarding the working set.

use crate::command::{StatusEntry, git_stdout, git_timeout, has_head, status_entries};

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use wipguard_core::{ActionSink, PathMatcher};

/// Resets tracked files to HEAD and, when enabled, deletes untracked files.
///
/// Files added since HEAD (or before the first commit) are unstaged and
/// deleted from disk, so a revert always leaves nothing uncommitted behind.
pub struct GitRevertAction {
    repo: PathBuf,
    remove_untracked: bool,
    timeout: Duration,
}

impl GitRevertAction {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            remove_untracked: true,
            timeout: git_timeout(),
        }
    }

    pub fn remove_untracked(mut self, remove_untracked: bool) -> Self {
        self.remove_untracked = remove_untracked;
        self
    }

    /// Returns the number of files that were reverted.
    pub fn revert(&self) -> crate::Result<usize> {
        self.revert_except(&[])
    }

    /// Revert every changed file not matched by `keep`. Returns the number of
    /// files that were reverted.
    pub fn revert_except(&self, keep: &[PathMatcher]) -> crate::Result<usize> {
        let targets: Vec<StatusEntry> =
            status_entries(&self.repo, self.remove_untracked, self.timeout)?
                .into_iter()
                .filter(|entry| !keep.iter().any(|m| m.matches(&entry.path)))
                .collect();
        if targets.is_empty() {
            return Ok(0);
        }

        if keep.is_empty() && has_head(&self.repo, self.timeout)? {
            git_stdout(&["reset", "--hard", "--quiet", "HEAD"], &self.repo, self.timeout)?;
            if self.remove_untracked {
                git_stdout(&["clean", "-fd", "--quiet"], &self.repo, self.timeout)?;
            }
        } else {
            let (restore, discard): (Vec<&StatusEntry>, Vec<&StatusEntry>) =
                targets.iter().partition(|entry| entry.in_head);
            if !restore.is_empty() {
                let mut args = vec!["--literal-pathspecs", "checkout", "--quiet", "HEAD", "--"];
                args.extend(restore.iter().map(|entry| entry.path.as_str()));
                git_stdout(&args, &self.repo, self.timeout)?;
            }
            if !discard.is_empty() {
                let mut args = vec![
                    "--literal-pathspecs",
                    "rm",
                    "--cached",
                    "--quiet",
                    "--ignore-unmatch",
                    "--",
                ];
                args.extend(discard.iter().map(|entry| entry.path.as_str()));
                git_stdout(&args, &self.repo, self.timeout)?;
                for entry in &discard {
                    self.delete(&entry.path)?;
                }
            }
        }

        info!(
            files = targets.len(),
            repo = %self.repo.display(),
            "Reverted working set"
        );
        Ok(targets.len())
    }

    fn delete(&self, path: &str) -> crate::Result<()> {
        match std::fs::remove_file(self.repo.join(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path, "Already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl ActionSink for GitRevertAction {
    fn revert_current_change_list(&self) -> wipguard_core::Result<bool> {
        Ok(self.revert()? > 0)
    }

    fn revert_current_change_list_except(
        &self,
        keep: &[PathMatcher],
    ) -> wipguard_core::Result<usize> {
        Ok(self.revert_except(keep)?)
    }
}
