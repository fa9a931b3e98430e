//! Implementation of the `welltemp config` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::CommandContext;
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration
    Show,
    /// Print the file the configuration is persisted to
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    #[serde(skip)]
    yaml: String,
    #[serde(flatten)]
    config: Config,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        self.yaml.trim_end().to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigPathOutput {
    pub path: PathBuf,
    pub exists: bool,
}

impl CommandOutput for ConfigPathOutput {
    fn to_human(&self) -> String {
        if self.exists {
            self.path.display().to_string()
        } else {
            format!("{} (not created yet)", self.path.display())
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ConfigArgs, ctx: &CommandContext) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let yaml =
                serde_yaml::to_string(&ctx.config).context("Failed to serialize configuration")?;
            output(
                &ConfigShowOutput {
                    yaml,
                    config: ctx.config.clone(),
                },
                ctx.json,
            );
        }
        ConfigCommands::Path => {
            let exists = tokio::fs::try_exists(&ctx.config_path)
                .await
                .unwrap_or(false);
            output(
                &ConfigPathOutput {
                    path: ctx.config_path.clone(),
                    exists,
                },
                ctx.json,
            );
        }
    }
    Ok(())
}
