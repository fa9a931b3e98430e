use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::value::{Dict, Value};
use figment::{Figment, Provider};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::models::config::{Config, KNOWN_KEYS};
use crate::domain::models::Medium;

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".welltemp";
/// Primary configuration file inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";
/// Optional local overrides inside [`CONFIG_DIR`]
pub const LOCAL_FILE: &str = "local.yaml";
/// Environment variable prefix; `__` separates nested keys
pub const ENV_PREFIX: &str = "WELLTEMP_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];
const ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid poll_interval_ms: {0}. Must be at least 1")]
    InvalidPollInterval(u64),

    #[error("Invalid plot_buffer_len: {0}. Must be at least 1")]
    InvalidPlotBufferLen(usize),

    #[error("Invalid sample_count: {0}. Must be at least 1")]
    InvalidSampleCount(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid {medium} coefficients: expected {expected}, got {actual}")]
    InvalidCoefficientCount {
        medium: Medium,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid {0} coefficients: values must be finite")]
    NonFiniteCoefficient(Medium),

    #[error("Instrument address cannot be empty")]
    EmptyInstrumentAddress,

    #[error("Output directory cannot be empty")]
    EmptyOutputDirectory,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .welltemp/config.yaml (project config, written on shutdown)
    /// 3. .welltemp/local.yaml (project local overrides, optional)
    /// 4. Environment variables (WELLTEMP_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`], rooted at an explicit config directory.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let figment = Self::figment_for_dir(dir);
        Self::report_unknown(&figment);
        Self::extract(&figment)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let figment = Self::figment_for_file(path);
        Self::report_unknown(&figment);
        Self::extract(&figment)
    }

    /// Merged sources for a config directory, not yet extracted.
    pub fn figment_for_dir(dir: impl AsRef<Path>) -> Figment {
        let dir = dir.as_ref();
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join(CONFIG_FILE)))
            .merge(Yaml::file(dir.join(LOCAL_FILE)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Defaults overlaid with a single file. Environment is not consulted.
    pub fn figment_for_file(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
    }

    /// Extract and validate.
    pub fn extract(figment: &Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .context("Failed to extract configuration from figment")?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Log unknown keys once, at warn level.
    pub fn report_unknown(figment: &Figment) {
        let unknown = Self::unknown_keys(figment);
        if !unknown.is_empty() {
            warn!(keys = ?unknown, "ignoring unknown configuration keys");
        }
    }

    /// Dotted keys present in the merged sources that no field claims, sorted.
    pub fn unknown_keys(figment: &Figment) -> Vec<String> {
        let Ok(data) = figment.data() else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        for dict in data.values() {
            collect_keys(dict, "", &mut keys);
        }
        let mut unknown: Vec<String> = keys
            .into_iter()
            .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let acquisition = &config.acquisition;
        if acquisition.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(acquisition.poll_interval_ms));
        }
        if acquisition.plot_buffer_len == 0 {
            return Err(ConfigError::InvalidPlotBufferLen(acquisition.plot_buffer_len));
        }
        if acquisition.sample_count == 0 {
            return Err(ConfigError::InvalidSampleCount(acquisition.sample_count));
        }

        if config.output.directory.as_os_str().is_empty()
            || config.output.calibration_directory.as_os_str().is_empty()
        {
            return Err(ConfigError::EmptyOutputDirectory);
        }

        for (medium, coefficients) in [
            (Medium::Air, &config.calibration.air_coefficients),
            (Medium::Water, &config.calibration.water_coefficients),
        ] {
            if coefficients.len() != medium.parameter_count() {
                return Err(ConfigError::InvalidCoefficientCount {
                    medium,
                    expected: medium.parameter_count(),
                    actual: coefficients.len(),
                });
            }
            if coefficients.iter().any(|c| !c.is_finite()) {
                return Err(ConfigError::NonFiniteCoefficient(medium));
            }
        }

        let devices = &config.devices;
        if !devices.mode.is_simulated() && devices.instrument_address.trim().is_empty() {
            return Err(ConfigError::EmptyInstrumentAddress);
        }
        if devices.io_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "devices.io_timeout_ms must be at least 1".to_string(),
            ));
        }

        let logging = &config.logging;
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
        }
        if !LOG_FORMATS.contains(&logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
        }
        if !ROTATIONS.contains(&logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(logging.rotation.clone()));
        }

        Ok(())
    }

    /// Path of the primary config file under `dir`.
    pub fn config_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(CONFIG_FILE)
    }

    /// Write `config` as YAML, creating parent directories.
    pub fn save(config: &Config, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

fn collect_keys(dict: &Dict, prefix: &str, out: &mut Vec<String>) {
    for (name, value) in dict {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match value {
            Value::Dict(_, nested) => collect_keys(nested, &key, out),
            _ => out.push(key),
        }
    }
}
