//! Configuration file.
//!
//! The file is the only place values are range-checked; [`WipConfig::to_settings`]
//! turns it into the [`Settings`] snapshot the machines consume.

use crate::tcr::default_test_patterns;
use crate::{
    LimboSettings, NEVER, PathMatcher, Result, Settings, TcrAction, TcrSettings, WipError,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const MAX_TIME_TILL_REVERT: u32 = 999;
const MAX_LINES_IN_CHANGE: u32 = 999;

/// Top-level configuration, one section per component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipConfig {
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub auto_revert: AutoRevertConfig,
    #[serde(default)]
    pub tcr: TcrConfig,
    #[serde(default)]
    pub limbo: LimboConfig,
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_lines_in_change")]
    pub max_lines_in_change: u32,
    /// Minutes between two "too big" alerts, or `"never"`.
    #[serde(default)]
    pub notification_interval_minutes: NotificationInterval,
    #[serde(default)]
    pub no_commits_above_threshold: bool,
    #[serde(default = "default_true")]
    pub show_remaining_changes_in_toolbar: bool,
    /// Wildcard patterns for paths that never count towards the change size.
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_lines_in_change: default_max_lines_in_change(),
            notification_interval_minutes: NotificationInterval::default(),
            no_commits_above_threshold: false,
            show_remaining_changes_in_toolbar: true,
            exclusions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRevertConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_time_till_revert")]
    pub time_till_revert: u32,
    #[serde(default)]
    pub time_unit: TimeUnit,
    #[serde(default = "default_true")]
    pub notify_on_revert: bool,
    #[serde(default = "default_true")]
    pub show_timer_in_toolbar: bool,
}

impl Default for AutoRevertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            time_till_revert: default_time_till_revert(),
            time_unit: TimeUnit::default(),
            notify_on_revert: true,
            show_timer_in_toolbar: true,
        }
    }
}

/// Test && commit || revert, driven by `wipguard test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcrConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub action_on_passed_test: TcrAction,
    #[serde(default)]
    pub notify_on_revert: bool,
    #[serde(default)]
    pub do_not_revert_tests: bool,
    /// Which files count as tests for `do_not_revert_tests`.
    #[serde(default = "default_test_patterns")]
    pub test_patterns: Vec<String>,
    #[serde(default)]
    pub do_not_revert_files: Vec<String>,
    /// Commit message; the last commit's message is reused when empty.
    #[serde(default)]
    pub commit_message: String,
}

impl Default for TcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            action_on_passed_test: TcrAction::default(),
            notify_on_revert: false,
            do_not_revert_tests: false,
            test_patterns: default_test_patterns(),
            do_not_revert_files: Vec::new(),
            commit_message: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimboConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub notify_on_revert: bool,
}

impl Default for LimboConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            notify_on_revert: true,
        }
    }
}

/// Settings for the git collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Count lines of untracked files as part of the change.
    #[serde(default = "default_true")]
    pub include_untracked: bool,
    /// Time budget for computing the change size.
    #[serde(default = "default_size_budget_millis")]
    pub size_budget_millis: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            include_untracked: true,
            size_budget_millis: default_size_budget_millis(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_lines_in_change() -> u32 {
    80
}

fn default_time_till_revert() -> u32 {
    2
}

fn default_size_budget_millis() -> u64 {
    2000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    #[default]
    Minutes,
}

impl TimeUnit {
    pub fn to_seconds(self, value: u32) -> u32 {
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Minutes => value.saturating_mul(60),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Seconds => write!(f, "seconds"),
            TimeUnit::Minutes => write!(f, "minutes"),
        }
    }
}

/// Interval between "too big" alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IntervalRepr", into = "IntervalRepr")]
pub enum NotificationInterval {
    Minutes(u32),
    #[default]
    Never,
}

impl NotificationInterval {
    pub fn to_seconds(self) -> u32 {
        match self {
            NotificationInterval::Minutes(minutes) => minutes.saturating_mul(60).min(NEVER - 1),
            NotificationInterval::Never => NEVER,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IntervalRepr {
    Minutes(u32),
    Keyword(String),
}

impl TryFrom<IntervalRepr> for NotificationInterval {
    type Error = String;

    fn try_from(repr: IntervalRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            IntervalRepr::Minutes(minutes) => Ok(NotificationInterval::Minutes(minutes)),
            IntervalRepr::Keyword(word) if word.eq_ignore_ascii_case("never") => {
                Ok(NotificationInterval::Never)
            }
            IntervalRepr::Keyword(word) => Err(format!(
                "expected a number of minutes or \"never\", got \"{word}\""
            )),
        }
    }
}

impl From<NotificationInterval> for IntervalRepr {
    fn from(interval: NotificationInterval) -> Self {
        match interval {
            NotificationInterval::Minutes(minutes) => IntervalRepr::Minutes(minutes),
            NotificationInterval::Never => IntervalRepr::Keyword("never".to_string()),
        }
    }
}

impl WipConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wipguard").join("config.toml"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Load from a TOML file, falling back to defaults when it does not exist.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save to a TOML file, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_toml()?).await?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate and convert into the settings snapshot.
    pub fn to_settings(&self) -> Result<Settings> {
        let revert = &self.auto_revert;
        let watchdog = &self.watchdog;

        check_range(
            "auto_revert.time_till_revert",
            revert.time_till_revert,
            MAX_TIME_TILL_REVERT,
        )?;
        check_range(
            "watchdog.max_lines_in_change",
            watchdog.max_lines_in_change,
            MAX_LINES_IN_CHANGE,
        )?;
        if watchdog.notification_interval_minutes == NotificationInterval::Minutes(0) {
            return Err(WipError::InvalidConfig(
                "watchdog.notification_interval_minutes must be at least 1".to_string(),
            ));
        }
        for pattern in &watchdog.exclusions {
            PathMatcher::parse(pattern)?;
        }

        Ok(Settings {
            auto_revert_enabled: revert.enabled,
            seconds_till_revert: revert.time_unit.to_seconds(revert.time_till_revert),
            notify_on_revert: revert.notify_on_revert,
            show_timer_in_toolbar: revert.show_timer_in_toolbar,
            watchdog_enabled: watchdog.enabled,
            max_lines_in_change: watchdog.max_lines_in_change,
            notification_interval_seconds: watchdog.notification_interval_minutes.to_seconds(),
            show_remaining_changes_in_toolbar: watchdog.show_remaining_changes_in_toolbar,
            no_commits_above_threshold: watchdog.no_commits_above_threshold,
            exclusions: watchdog.exclusions.clone(),
        })
    }
}

impl WipConfig {
    /// Validate and convert the `[tcr]` section.
    pub fn tcr_settings(&self) -> Result<TcrSettings> {
        self.check_test_modes()?;
        let tcr = &self.tcr;
        let settings = TcrSettings {
            enabled: tcr.enabled,
            notify_on_revert: tcr.notify_on_revert,
            action_on_passed_test: tcr.action_on_passed_test,
            do_not_revert_tests: tcr.do_not_revert_tests,
            test_patterns: tcr.test_patterns.clone(),
            do_not_revert_files: tcr.do_not_revert_files.clone(),
        };
        for pattern in tcr.test_patterns.iter().chain(&tcr.do_not_revert_files) {
            PathMatcher::parse(pattern)?;
        }
        Ok(settings)
    }

    /// Validate and convert the `[limbo]` section.
    pub fn limbo_settings(&self) -> Result<LimboSettings> {
        self.check_test_modes()?;
        Ok(LimboSettings {
            enabled: self.limbo.enabled,
            notify_on_revert: self.limbo.notify_on_revert,
        })
    }

    /// Both would revert on a failing run, and only TCR keeps tests.
    fn check_test_modes(&self) -> Result<()> {
        if self.tcr.enabled && self.limbo.enabled {
            return Err(WipError::InvalidConfig(
                "tcr and limbo cannot be enabled together".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_range(key: &str, value: u32, max: u32) -> Result<()> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(WipError::InvalidConfig(format!(
            "{key} must be between 1 and {max}, got {value}"
        )))
    }
}
