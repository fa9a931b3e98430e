//! Typed configuration.
//!
//! Persisted keys map one-to-one onto fields, grouped by section:
//!
//! | key                                   | field                                   |
//! |---------------------------------------|-----------------------------------------|
//! | `acquisition.poll_interval_ms`        | [`AcquisitionConfig::poll_interval_ms`] |
//! | `acquisition.post_measurement_delay_ms` | [`AcquisitionConfig::post_measurement_delay_ms`] |
//! | `acquisition.edge_timeout_ms`         | [`AcquisitionConfig::edge_timeout_ms`]  |
//! | `acquisition.trigger`                 | [`AcquisitionConfig::trigger`]          |
//! | `acquisition.sample_count`            | [`AcquisitionConfig::sample_count`]     |
//! | `acquisition.plot_buffer_len`         | [`AcquisitionConfig::plot_buffer_len`]  |
//! | `output.directory`                    | [`OutputConfig::directory`]             |
//! | `output.calibration_directory`        | [`OutputConfig::calibration_directory`] |
//! | `calibration.medium`                  | [`CalibrationConfig::medium`]           |
//! | `calibration.air_coefficients`        | [`CalibrationConfig::air_coefficients`] |
//! | `calibration.water_coefficients`      | [`CalibrationConfig::water_coefficients`] |
//! | `devices.mode`                        | [`DevicesConfig::mode`]                 |
//! | `devices.instrument_address`          | [`DevicesConfig::instrument_address`]   |
//! | `devices.reference_address`           | [`DevicesConfig::reference_address`]    |
//! | `devices.signal_line_path`            | [`DevicesConfig::signal_line_path`]     |
//! | `devices.active_low`                  | [`DevicesConfig::active_low`]           |
//! | `devices.io_timeout_ms`               | [`DevicesConfig::io_timeout_ms`]        |
//! | `logging.level`                       | [`LoggingConfig::level`]                |
//! | `logging.format`                      | [`LoggingConfig::format`]               |
//! | `logging.log_dir`                     | [`LoggingConfig::log_dir`]              |
//! | `logging.rotation`                    | [`LoggingConfig::rotation`]             |
//!
//! Missing keys take their defaults. Keys outside this table are ignored;
//! the loader reports them (sorted) with a single warning.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::calibration::{CalibrationModel, Medium, AIR_BOOTSTRAP, WATER_BOOTSTRAP};
use crate::domain::errors::DomainResult;
use crate::domain::ports::DeviceKind;

/// Every dotted key the configuration understands.
pub const KNOWN_KEYS: &[&str] = &[
    "acquisition.poll_interval_ms",
    "acquisition.post_measurement_delay_ms",
    "acquisition.edge_timeout_ms",
    "acquisition.trigger",
    "acquisition.sample_count",
    "acquisition.plot_buffer_len",
    "output.directory",
    "output.calibration_directory",
    "calibration.medium",
    "calibration.air_coefficients",
    "calibration.water_coefficients",
    "devices.mode",
    "devices.instrument_address",
    "devices.reference_address",
    "devices.signal_line_path",
    "devices.active_low",
    "devices.io_timeout_ms",
    "logging.level",
    "logging.format",
    "logging.log_dir",
    "logging.rotation",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Timing and trigger parameters of the scan loop
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Where session and calibration files go
    #[serde(default)]
    pub output: OutputConfig,

    /// Medium and conversion coefficients
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Device adapters
    #[serde(default)]
    pub devices: DevicesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the edge detector interprets the trigger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSemantics {
    /// Fire only on an inactive to active transition.
    #[default]
    Edge,
    /// Fire as soon as the line reads active.
    Level,
}

/// Scan loop timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct AcquisitionConfig {
    /// Trigger line poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between the end of one iteration and the start of the next
    #[serde(default = "default_post_measurement_delay_ms")]
    pub post_measurement_delay_ms: u64,

    /// Longest edge wait before an iteration gives up without measuring
    #[serde(default = "default_edge_timeout_ms")]
    pub edge_timeout_ms: u64,

    /// Edge or level triggering
    #[serde(default)]
    pub trigger: TriggerSemantics,

    /// Integration setting sent to the instrument (NPLC)
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,

    /// Samples kept for live display
    #[serde(default = "default_plot_buffer_len")]
    pub plot_buffer_len: usize,
}

const fn default_poll_interval_ms() -> u64 {
    10
}

const fn default_post_measurement_delay_ms() -> u64 {
    50
}

const fn default_edge_timeout_ms() -> u64 {
    10_000
}

const fn default_sample_count() -> u32 {
    10
}

const fn default_plot_buffer_len() -> usize {
    500
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            post_measurement_delay_ms: default_post_measurement_delay_ms(),
            edge_timeout_ms: default_edge_timeout_ms(),
            trigger: TriggerSemantics::default(),
            sample_count: default_sample_count(),
            plot_buffer_len: default_plot_buffer_len(),
        }
    }
}

impl AcquisitionConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn post_measurement_delay(&self) -> Duration {
        Duration::from_millis(self.post_measurement_delay_ms)
    }

    pub const fn edge_timeout(&self) -> Duration {
        Duration::from_millis(self.edge_timeout_ms)
    }
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct OutputConfig {
    /// Directory receiving one row log per scan session
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Directory receiving one point log per calibration session
    #[serde(default = "default_calibration_directory")]
    pub calibration_directory: PathBuf,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_calibration_directory() -> PathBuf {
    PathBuf::from("data/calibration")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            calibration_directory: default_calibration_directory(),
        }
    }
}

/// Conversion settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CalibrationConfig {
    /// Medium used for conversion during a scan
    #[serde(default)]
    pub medium: Medium,

    /// `[a, b]`
    #[serde(default = "default_air_coefficients")]
    pub air_coefficients: Vec<f64>,

    /// `[a, b, c, d]`
    #[serde(default = "default_water_coefficients")]
    pub water_coefficients: Vec<f64>,
}

fn default_air_coefficients() -> Vec<f64> {
    AIR_BOOTSTRAP.to_vec()
}

fn default_water_coefficients() -> Vec<f64> {
    WATER_BOOTSTRAP.to_vec()
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            medium: Medium::default(),
            air_coefficients: default_air_coefficients(),
            water_coefficients: default_water_coefficients(),
        }
    }
}

impl CalibrationConfig {
    /// Model for the selected medium built from the configured coefficients.
    pub fn model(&self) -> DomainResult<CalibrationModel> {
        self.model_for(self.medium)
    }

    pub fn model_for(&self, medium: Medium) -> DomainResult<CalibrationModel> {
        let coefficients = match medium {
            Medium::Air => self.air_coefficients.clone(),
            Medium::Water => self.water_coefficients.clone(),
        };
        CalibrationModel::new(medium, coefficients)
    }

    /// Store a fitted model's coefficients under its medium.
    pub fn apply(&mut self, model: &CalibrationModel) {
        match model.medium() {
            Medium::Air => self.air_coefficients = model.coefficients().to_vec(),
            Medium::Water => self.water_coefficients = model.coefficients().to_vec(),
        }
    }
}

/// Device adapter selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct DevicesConfig {
    /// Real adapters or the simulated set
    #[serde(default = "default_device_mode")]
    pub mode: DeviceKind,

    /// SCPI socket of the measurement instrument (`host:port`)
    #[serde(default = "default_instrument_address")]
    pub instrument_address: String,

    /// SCPI socket of the calibration reference instrument
    #[serde(default)]
    pub reference_address: Option<String>,

    /// GPIO value file of the trigger line
    #[serde(default = "default_signal_line_path")]
    pub signal_line_path: PathBuf,

    /// Treat a `0` on the trigger line as active
    #[serde(default)]
    pub active_low: bool,

    /// Per-command instrument I/O timeout
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

const fn default_device_mode() -> DeviceKind {
    DeviceKind::Simulated
}

fn default_instrument_address() -> String {
    "127.0.0.1:5025".to_string()
}

fn default_signal_line_path() -> PathBuf {
    PathBuf::from("/sys/class/gpio/gpio17/value")
}

const fn default_io_timeout_ms() -> u64 {
    2_000
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            mode: default_device_mode(),
            instrument_address: default_instrument_address(),
            reference_address: None,
            signal_line_path: default_signal_line_path(),
            active_low: false,
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.acquisition.poll_interval(), Duration::from_millis(10));
        assert_eq!(
            config.acquisition.post_measurement_delay(),
            Duration::from_millis(50)
        );
        assert_eq!(config.acquisition.trigger, TriggerSemantics::Edge);
        assert_eq!(config.devices.mode, DeviceKind::Simulated);
        assert_eq!(config.calibration.medium, Medium::Air);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r"
acquisition:
  poll_interval_ms: 25
calibration:
  medium: water
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.acquisition.poll_interval_ms, 25);
        assert_eq!(config.acquisition.post_measurement_delay_ms, 50);
        assert_eq!(config.calibration.medium, Medium::Water);
        assert_eq!(config.calibration.water_coefficients, WATER_BOOTSTRAP.to_vec());
    }

    #[test]
    fn test_model_from_config() {
        let mut calibration = CalibrationConfig::default();
        let fitted = CalibrationModel::new(Medium::Air, vec![1.0, 2.0]).unwrap();
        calibration.apply(&fitted);

        assert_eq!(calibration.model().unwrap(), fitted);
        assert_eq!(calibration.water_coefficients, WATER_BOOTSTRAP.to_vec());
    }

    #[test]
    fn test_bad_coefficient_count_is_rejected() {
        let calibration = CalibrationConfig {
            medium: Medium::Water,
            water_coefficients: vec![1.0],
            ..Default::default()
        };
        assert!(calibration.model().is_err());
    }

    #[test]
    fn test_known_keys_cover_every_section() {
        for section in ["acquisition", "output", "calibration", "devices", "logging"] {
            assert!(KNOWN_KEYS.iter().any(|k| k.starts_with(section)));
        }
    }
}
