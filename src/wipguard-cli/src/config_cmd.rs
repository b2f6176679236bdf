//! Config command - show or create the configuration file.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wipguard_core::WipConfig;

use crate::utils::load_settings;

/// Config CLI.
#[derive(Debug, Parser)]
pub struct ConfigCli {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location
    Path,
}

impl ConfigCli {
    pub async fn run(self, config_path: PathBuf) -> Result<()> {
        match self.action {
            ConfigAction::Show => {
                let (config, _) = load_settings(&config_path).await?;
                print!("{}", config.to_toml()?);
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    bail!(
                        "{} already exists (use --force to overwrite)",
                        config_path.display()
                    );
                }
                WipConfig::default()
                    .save(&config_path)
                    .await
                    .with_context(|| format!("Failed to write {}", config_path.display()))?;
                println!("Wrote {}", config_path.display());
            }
            ConfigAction::Path => println!("{}", config_path.display()),
        }
        Ok(())
    }
}
