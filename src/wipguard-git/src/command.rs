//! Running git with a timeout.

use crate::{GitError, Result};

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for git operations in seconds
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 30;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Hash of the empty tree, used as the diff base before the first commit.
pub(crate) const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Get the configured git timeout duration
pub(crate) fn git_timeout() -> Duration {
    std::env::var("WIPGUARD_GIT_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Run git in `cwd`, killing it once `timeout` passes.
///
/// Output pipes are drained on helper threads so a chatty command cannot
/// block on a full pipe while we wait for it.
pub(crate) fn run_git(args: &[&str], cwd: &Path, timeout: Duration) -> Result<Output> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let start = Instant::now();

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            debug!(?args, "Git command killed after timeout");
            return Err(GitError::GitTimeout {
                command: format!("git {}", args.join(" ")),
                timeout_millis: timeout.as_millis(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: join(stdout)?,
        stderr: join(stderr)?,
    })
}

/// Run git and return stdout, failing on a non-zero exit.
pub(crate) fn git_stdout(args: &[&str], cwd: &Path, timeout: Duration) -> Result<String> {
    let output = run_git(args, cwd, timeout)?;
    if !output.status.success() {
        return Err(GitError::GitFailed(format!(
            "git {}: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> Option<thread::JoinHandle<std::io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join(handle: Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| GitError::GitFailed("output reader panicked".to_string()))?
            .map_err(GitError::from),
        None => Ok(Vec::new()),
    }
}

/// Whether HEAD points at a commit.
pub(crate) fn has_head(cwd: &Path, timeout: Duration) -> Result<bool> {
    let output = run_git(&["rev-parse", "--verify", "--quiet", "HEAD"], cwd, timeout)?;
    Ok(output.status.success())
}

/// Current HEAD commit, `None` before the first commit.
pub(crate) fn head_commit(cwd: &Path, timeout: Duration) -> Result<Option<String>> {
    let output = run_git(&["rev-parse", "--verify", "--quiet", "HEAD"], cwd, timeout)?;
    if output.status.success() {
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    } else {
        Ok(None)
    }
}

/// One changed path from `git status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusEntry {
    pub path: String,
    /// The path exists in HEAD, so reverting restores it instead of deleting it.
    pub in_head: bool,
}

/// Changed paths, relative to the repository root.
pub(crate) fn status_entries(
    cwd: &Path,
    include_untracked: bool,
    timeout: Duration,
) -> Result<Vec<StatusEntry>> {
    let untracked = if include_untracked {
        "--untracked-files=all"
    } else {
        "--untracked-files=no"
    };
    let stdout = git_stdout(
        &["status", "--porcelain", "-z", "--no-renames", untracked],
        cwd,
        timeout,
    )?;
    Ok(stdout
        .split('\0')
        .filter(|entry| entry.len() > 3)
        .map(|entry| {
            let index = entry.as_bytes()[0];
            let worktree = entry.as_bytes()[1];
            StatusEntry {
                path: entry[3..].to_string(),
                in_head: index != b'?' && index != b'A' && worktree != b'A',
            }
        })
        .collect())
}

pub(crate) fn uncommitted_files(
    cwd: &Path,
    include_untracked: bool,
    timeout: Duration,
) -> Result<Vec<String>> {
    Ok(status_entries(cwd, include_untracked, timeout)?
        .into_iter()
        .map(|entry| entry.path)
        .collect())
}

/// Subject of the newest HEAD reflog entry, e.g. `commit: message` or
/// `checkout: moving from main to topic`. `None` when there is no reflog.
pub(crate) fn last_reflog_subject(cwd: &Path, timeout: Duration) -> Result<Option<String>> {
    let output = run_git(&["reflog", "-1", "--format=%gs", "HEAD"], cwd, timeout)?;
    let subject = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || subject.is_empty() {
        return Ok(None);
    }
    Ok(Some(subject))
}

/// Absolute path of the `.git` directory.
pub(crate) fn git_dir(cwd: &Path, timeout: Duration) -> Result<PathBuf> {
    let stdout = git_stdout(&["rev-parse", "--absolute-git-dir"], cwd, timeout)
        .map_err(|_| GitError::NotGitRepo(cwd.display().to_string()))?;
    Ok(PathBuf::from(stdout.trim()))
}

/// Whether a `git` binary can be run.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if a path is inside a git repository.
pub fn is_git_repo(path: &Path) -> bool {
    matches!(
        run_git(&["rev-parse", "--git-dir"], path, git_timeout()),
        Ok(o) if o.status.success()
    )
}

/// Get the git repository root.
pub fn repo_root(cwd: &Path) -> Result<PathBuf> {
    let stdout = git_stdout(&["rev-parse", "--show-toplevel"], cwd, git_timeout())
        .map_err(|_| GitError::NotGitRepo(cwd.display().to_string()))?;
    Ok(PathBuf::from(stdout.trim()))
}
