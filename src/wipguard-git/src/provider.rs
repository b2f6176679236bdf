//! Change size from `git diff --numstat`.

use crate::GitError;
use crate::command::{EMPTY_TREE, git_stdout, has_head, run_git};

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wipguard_core::config::GitConfig;
use wipguard_core::{ChangeSize, ChangeSizeProvider, ChangeSizesByPath};

/// Sizes the working tree against HEAD.
///
/// A modified file counts `max(added, deleted)` lines so an edited line is
/// counted once. Binary files count zero. Untracked files count their lines
/// when enabled. When the size budget runs out the last complete result is
/// served again, marked approximate.
pub struct GitChangeSizeProvider {
    repo: PathBuf,
    include_untracked: bool,
    size_budget: Duration,
    last: Mutex<Option<ChangeSizesByPath>>,
}

impl GitChangeSizeProvider {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self::with_config(repo, &GitConfig::default())
    }

    pub fn with_config(repo: impl Into<PathBuf>, config: &GitConfig) -> Self {
        Self {
            repo: repo.into(),
            include_untracked: config.include_untracked,
            size_budget: Duration::from_millis(config.size_budget_millis),
            last: Mutex::new(None),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Sizes of what is staged for the next commit.
    pub fn staged_sizes(&self) -> crate::Result<ChangeSizesByPath> {
        let base = self.diff_base(self.size_budget)?;
        let stdout = git_stdout(
            &["diff", "--numstat", "--no-renames", "--cached", base],
            &self.repo,
            self.size_budget,
        )?;
        Ok(parse_numstat(&stdout))
    }

    fn diff_base(&self, timeout: Duration) -> crate::Result<&'static str> {
        Ok(if has_head(&self.repo, timeout)? {
            "HEAD"
        } else {
            EMPTY_TREE
        })
    }

    fn compute(&self, deadline: Instant) -> crate::Result<ChangeSizesByPath> {
        let base = self.diff_base(remaining(deadline))?;
        let stdout = git_stdout(
            &["diff", "--numstat", "--no-renames", base],
            &self.repo,
            remaining(deadline),
        )?;
        let mut sizes = parse_numstat(&stdout);

        if !self.include_untracked {
            return Ok(sizes);
        }

        let output = run_git(
            &["ls-files", "--others", "--exclude-standard", "-z"],
            &self.repo,
            remaining(deadline),
        )?;
        let listing = String::from_utf8_lossy(&output.stdout);
        for path in listing.split('\0').filter(|p| !p.is_empty()) {
            if Instant::now() >= deadline {
                debug!("Size budget exhausted while counting untracked files");
                return Ok(sizes.into_approximate());
            }
            sizes.push(path, ChangeSize::new(count_lines(&self.repo.join(path))));
        }
        Ok(sizes)
    }
}

impl ChangeSizeProvider for GitChangeSizeProvider {
    fn change_sizes_by_path(&self) -> wipguard_core::Result<ChangeSizesByPath> {
        let deadline = Instant::now() + self.size_budget;
        let mut last = self
            .last
            .lock()
            .map_err(|_| wipguard_core::WipError::ChangeSizeUnavailable("cache poisoned".into()))?;

        match self.compute(deadline) {
            Ok(sizes) => {
                *last = Some(sizes.clone());
                Ok(sizes)
            }
            Err(GitError::GitTimeout { .. }) => {
                warn!(budget_ms = self.size_budget.as_millis(), "Change size timed out");
                Ok(match last.as_ref() {
                    Some(sizes) => sizes.clone().into_approximate(),
                    None => ChangeSizesByPath::total_only(ChangeSize::approximately_empty()),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Parse `added<TAB>deleted<TAB>path` lines; binary files show `-`.
fn parse_numstat(stdout: &str) -> ChangeSizesByPath {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let added = parts.next()?;
            let deleted = parts.next()?;
            let path = parts.next()?;
            let lines = match (added.parse::<u32>(), deleted.parse::<u32>()) {
                (Ok(added), Ok(deleted)) => added.max(deleted),
                _ => 0,
            };
            Some((path.to_string(), ChangeSize::new(lines)))
        })
        .collect()
}

fn count_lines(path: &Path) -> u32 {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), "Skipping unreadable file: {}", e);
            return 0;
        }
    };
    if content.contains(&0) {
        return 0;
    }
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    let trailing = usize::from(content.last().is_some_and(|&b| b != b'\n'));
    u32::try_from(newlines + trailing).unwrap_or(u32::MAX)
}
