//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;

pub use types::{Cli, Commands};

use crate::domain::models::Config;
use crate::domain::ports::DeviceKind;
use crate::infrastructure::config::ConfigLoader;

/// Resolved configuration plus global flags, handed to every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
    /// Where the configuration is persisted on shutdown
    pub config_path: PathBuf,
    pub json: bool,
}

impl CommandContext {
    pub fn new(config: Config, config_path: PathBuf, json: bool) -> Self {
        Self {
            config,
            config_path,
            json,
        }
    }

    /// Copy of the configuration, forced onto simulated devices if asked.
    pub fn config_with_devices(&self, simulate: bool) -> Config {
        let mut config = self.config.clone();
        if simulate {
            config.devices.mode = DeviceKind::Simulated;
        }
        config
    }

    /// Persist `config` to [`CommandContext::config_path`].
    pub fn persist(&self, config: &Config) -> Result<()> {
        ConfigLoader::save(config, &self.config_path)
    }
}

/// Print a command error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        let value = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain.get(1..).unwrap_or_default(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_default()
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
