//! Status command - show the current change size.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use wipguard_core::format::change_size_text;
use wipguard_core::{ChangeSize, ChangeSizeProvider, ChangeSizesByPath, Settings};
use wipguard_git::GitChangeSizeProvider;

use crate::utils::{load_settings, resolve_repo};

/// Status CLI.
#[derive(Debug, Parser)]
pub struct StatusCli {
    /// Repository to inspect (default: current directory)
    #[arg(long, short = 'r')]
    pub repo: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List the size of every changed file
    #[arg(long)]
    pub files: bool,
}

/// Change size report.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub repo: PathBuf,
    pub change_size: ChangeSize,
    pub max_lines_in_change: u32,
    pub exceeded: bool,
    /// Files left out by exclusion patterns.
    pub excluded_files: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileSize>,
}

#[derive(Debug, Serialize)]
pub struct FileSize {
    pub path: String,
    pub lines: u32,
}

impl StatusReport {
    pub fn new(
        repo: PathBuf,
        sizes: &ChangeSizesByPath,
        settings: &Settings,
        with_files: bool,
    ) -> Result<Self> {
        let exclusions = settings.exclusion_matchers()?;
        let counted = sizes.excluding(&exclusions);
        let change_size = counted.total();
        let files = if with_files {
            counted
                .entries()
                .iter()
                .map(|(path, size)| FileSize {
                    path: path.clone(),
                    lines: size.value,
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok(Self {
            repo,
            change_size,
            max_lines_in_change: settings.max_lines_in_change,
            exceeded: change_size.value > settings.max_lines_in_change,
            excluded_files: sizes.len() - counted.len(),
            files,
        })
    }
}

impl StatusCli {
    pub async fn run(self, config_path: PathBuf) -> Result<()> {
        let repo = resolve_repo(self.repo)?;
        let (config, settings) = load_settings(&config_path).await?;

        let provider = GitChangeSizeProvider::with_config(&repo, &config.git);
        let sizes = tokio::task::spawn_blocking(move || provider.change_sizes_by_path())
            .await?
            .context("Failed to compute change size")?;

        let report = StatusReport::new(repo, &sizes, &settings, self.files)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "{}",
            change_size_text(report.change_size, report.max_lines_in_change)
        );
        for file in &report.files {
            println!("  {:>5}  {}", file.lines, file.path);
        }
        if report.excluded_files > 0 {
            println!("({} excluded files not counted)", report.excluded_files);
        }
        if report.exceeded {
            println!("Change size is above the limit.");
        }
        Ok(())
    }
}
