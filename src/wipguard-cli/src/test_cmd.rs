//! Test command - run the tests, then let TCR and Limbo react.
//!
//! A passing run commits (TCR) or counts towards the next commit (Limbo). A
//! failing run reverts the change list in either mode.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use wipguard_core::WipConfig;
use wipguard_git::RepoState;

use crate::notifier::LogNotifier;
use crate::utils::{load_settings, resolve_repo, test_modes};

/// Test CLI.
#[derive(Debug, Parser)]
pub struct TestCli {
    /// Repository to test (default: current directory)
    #[arg(long, short = 'r')]
    pub repo: Option<PathBuf>,

    /// Message for TCR commits (default: [tcr] commit_message, else the last commit's)
    #[arg(long, short = 'm')]
    pub message: Option<String>,

    /// Test command and its arguments, e.g. `wipguard test -- cargo test`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl TestCli {
    pub async fn run(self, config_path: PathBuf) -> Result<()> {
        let repo = resolve_repo(self.repo)?;
        let (config, _) = load_settings(&config_path).await?;
        let Some((program, args)) = self.command.split_first() else {
            bail!("No test command given");
        };

        info!(command = %self.command.join(" "), "Running tests");
        let status = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&repo)
            .status()
            .await
            .with_context(|| format!("Failed to run '{}'", program))?;
        let passed = status.success();

        let message = self.message;
        tokio::task::spawn_blocking(move || record_test_run(&repo, &config, passed, message))
            .await??;
        if !passed {
            bail!("Tests failed ({})", status);
        }
        Ok(())
    }
}

/// Report one test run to TCR and Limbo and save their state. Returns whether
/// TCR committed.
pub fn record_test_run(
    repo: &Path,
    config: &WipConfig,
    passed: bool,
    message: Option<String>,
) -> Result<bool> {
    let mut state = RepoState::load(repo).context("Failed to read wipguard state")?;
    let (mut tcr, mut limbo) =
        test_modes(repo, config, Arc::new(LogNotifier::new()), &state, message)?;

    let committed = if passed {
        limbo.on_unit_test_succeeded();
        tcr.on_unit_test_succeeded()
            .context("Failed to commit after passing tests")?
    } else {
        tcr.on_unit_test_failed()
            .context("Failed to revert after failing tests")?;
        limbo
            .on_unit_test_failed()
            .context("Failed to revert after failing tests")?;
        false
    };

    state.tcr = tcr.state().clone();
    state.limbo = limbo.state().clone();
    if committed {
        state.record_commit();
    }
    state.save(repo).context("Failed to save wipguard state")?;
    Ok(committed)
}
