//! Welltemp - Well Temperature Logger
//!
//! Welltemp waits for a hardware trigger edge, reads a resistance probe,
//! converts the reading to temperature through a fitted calibration model
//! and appends one row per sample to a session file.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the device/recorder ports
//! - **Service Layer** (`services`): Edge detection, acquisition, conversion,
//!   calibration fitting and the scan loop
//! - **Infrastructure Layer** (`infrastructure`): Device adapters, recorders,
//!   configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use welltemp::infrastructure::devices::build_device_set;
//! use welltemp::{CoefficientStore, Config, DeviceSession, ScanController, ScanSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let devices = DeviceSession::new(build_device_set(&config.devices));
//!     let store = CoefficientStore::new(config.calibration.model()?);
//!     let mut scan = ScanController::new(ScanSettings::from_config(&config), devices, store);
//!     scan.start("well-1").await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     let report = scan.stop().await?;
//!     println!("{} samples", report.samples);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CalibrationModel, CalibrationPoint, Config, LoggingConfig, Medium, Sample, ScanState,
    ThermalProfile,
};
pub use domain::ports::{DeviceKind, MeasurementInstrument, Recorder, SignalLine};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};
pub use services::{
    CalibrationFitter, CalibrationSession, CoefficientStore, DeviceSession, EdgeDetector,
    MeasurementSource, ScanController, ScanEvent, ScanReport, ScanSettings, TemperatureConverter,
};
