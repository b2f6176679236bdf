//! State shared between wipguard processes working on the same repository.
//!
//! Lives in `<git-dir>/wipguard/state.toml`, so it never shows up as a change.

use crate::command::{git_dir, git_timeout};

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use wipguard_core::{LimboState, TcrState};

const STATE_DIR: &str = "wipguard";
const STATE_FILE: &str = "state.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    /// Let the next commit through every check.
    #[serde(default)]
    pub force_commit: bool,
    #[serde(default)]
    pub tcr: TcrState,
    #[serde(default)]
    pub limbo: LimboState,
}

impl RepoState {
    pub fn path(repo: &Path) -> crate::Result<PathBuf> {
        Ok(git_dir(repo, git_timeout())?.join(STATE_DIR).join(STATE_FILE))
    }

    /// A missing file is the default state.
    pub fn load(repo: &Path) -> crate::Result<Self> {
        let path = Self::path(repo)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, repo: &Path) -> crate::Result<()> {
        let path = Self::path(repo)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string(self)?)?;
        debug!(path = %path.display(), "Saved repository state");
        Ok(())
    }

    /// Load, apply `f` and save.
    pub fn update<T>(repo: &Path, f: impl FnOnce(&mut Self) -> T) -> crate::Result<T> {
        let mut state = Self::load(repo)?;
        let out = f(&mut state);
        state.save(repo)?;
        Ok(out)
    }

    /// A commit went through: the force flag is used up and both test modes
    /// start over.
    pub fn record_commit(&mut self) {
        self.force_commit = false;
        self.tcr.on_successful_commit();
        self.limbo.on_successful_commit();
    }
}
