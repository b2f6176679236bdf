//! `check-commit`, `test` and `post-commit` against temporary repositories.
//! Skipped when git is missing.

use std::path::Path;
use std::process::Command;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use wipguard_cli::check_cmd::check_commit;
use wipguard_cli::test_cmd::record_test_run;
use wipguard_core::config::{LimboConfig, TcrConfig};
use wipguard_core::{Settings, TcrAction, WipConfig};
use wipguard_git::{RepoState, git_available};

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo() -> Option<TempDir> {
    if !git_available() {
        eprintln!("git not available, skipping");
        return None;
    }
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "--quiet"]);
    git(dir.path(), &["config", "user.email", "test@test.com"]);
    git(dir.path(), &["config", "user.name", "Test"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.path().join("lib.txt"), "a\n").unwrap();
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "--quiet", "-m", "initial"]);
    Some(dir)
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn blocking_settings(max_lines: u32) -> Settings {
    Settings {
        max_lines_in_change: max_lines,
        no_commits_above_threshold: true,
        ..Settings::default()
    }
}

fn limbo_config() -> WipConfig {
    WipConfig {
        limbo: LimboConfig {
            enabled: true,
            ..LimboConfig::default()
        },
        ..WipConfig::default()
    }
}

#[test]
fn test_large_commit_is_rejected() {
    let Some(repo) = init_repo() else { return };
    write(repo.path(), "lib.txt", "a\nb\nc\nd\n");
    git(repo.path(), &["add", "lib.txt"]);

    let config = WipConfig::default();
    assert!(!check_commit(repo.path(), &config, blocking_settings(2), false).unwrap());
    assert!(check_commit(repo.path(), &config, blocking_settings(2), true).unwrap());
}

#[test]
fn test_force_marker_allows_one_commit() {
    let Some(repo) = init_repo() else { return };
    write(repo.path(), "lib.txt", "a\nb\nc\nd\n");
    git(repo.path(), &["add", "lib.txt"]);

    // What `force-commit` in a running watch leaves behind.
    RepoState::update(repo.path(), |state| state.force_commit = true).unwrap();

    let config = WipConfig::default();
    assert!(check_commit(repo.path(), &config, blocking_settings(2), false).unwrap());
    assert!(!RepoState::load(repo.path()).unwrap().force_commit);
    assert!(!check_commit(repo.path(), &config, blocking_settings(2), false).unwrap());
}

#[test]
fn test_limbo_needs_a_passing_run_since_last_commit() {
    let Some(repo) = init_repo() else { return };
    write(repo.path(), "lib.txt", "b\n");
    git(repo.path(), &["add", "lib.txt"]);

    let config = limbo_config();
    let settings = Settings::default();
    assert!(!check_commit(repo.path(), &config, settings.clone(), false).unwrap());

    assert!(!record_test_run(repo.path(), &config, true, None).unwrap());
    assert_eq!(RepoState::load(repo.path()).unwrap().limbo.tests_run, 1);
    assert!(check_commit(repo.path(), &config, settings.clone(), false).unwrap());

    git(repo.path(), &["commit", "--quiet", "-m", "second"]);
    RepoState::update(repo.path(), RepoState::record_commit).unwrap();
    write(repo.path(), "lib.txt", "c\n");
    git(repo.path(), &["add", "lib.txt"]);
    assert!(!check_commit(repo.path(), &config, settings, false).unwrap());
}

#[test]
fn test_limbo_failing_run_reverts() {
    let Some(repo) = init_repo() else { return };
    write(repo.path(), "lib.txt", "broken\n");
    write(repo.path(), "new.txt", "x\n");

    record_test_run(repo.path(), &limbo_config(), false, None).unwrap();
    assert_eq!(
        std::fs::read_to_string(repo.path().join("lib.txt")).unwrap(),
        "a\n"
    );
    assert!(!repo.path().join("new.txt").exists());
}

#[test]
fn test_tcr_commits_on_pass_and_reverts_on_fail() {
    let Some(repo) = init_repo() else { return };
    let config = WipConfig {
        tcr: TcrConfig {
            enabled: true,
            do_not_revert_tests: true,
            ..TcrConfig::default()
        },
        ..WipConfig::default()
    };

    write(repo.path(), "lib.txt", "green\n");
    assert!(record_test_run(repo.path(), &config, true, Some("green".to_string())).unwrap());
    assert_eq!(git(repo.path(), &["log", "-1", "--format=%s"]), "green");
    assert_eq!(git(repo.path(), &["status", "--porcelain"]), "");

    write(repo.path(), "lib.txt", "red\n");
    write(repo.path(), "lib_test.txt", "new test\n");
    assert!(!record_test_run(repo.path(), &config, false, None).unwrap());
    assert_eq!(
        std::fs::read_to_string(repo.path().join("lib.txt")).unwrap(),
        "green\n"
    );
    assert!(repo.path().join("lib_test.txt").exists());
}

#[test]
fn test_tcr_allow_commit_checks_tested_change_list() {
    let Some(repo) = init_repo() else { return };
    let config = WipConfig {
        tcr: TcrConfig {
            enabled: true,
            action_on_passed_test: TcrAction::AllowCommit,
            ..TcrConfig::default()
        },
        ..WipConfig::default()
    };
    let settings = Settings::default();

    write(repo.path(), "lib.txt", "b\n");
    git(repo.path(), &["add", "lib.txt"]);
    assert!(!check_commit(repo.path(), &config, settings.clone(), false).unwrap());

    assert!(!record_test_run(repo.path(), &config, true, None).unwrap());
    assert_eq!(git(repo.path(), &["rev-list", "--count", "HEAD"]), "1");
    assert!(check_commit(repo.path(), &config, settings, false).unwrap());
}
