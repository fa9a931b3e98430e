//! Domain models: samples, calibration, scan state and configuration.

pub mod calibration;
pub mod config;
pub mod sample;
pub mod scan_state;
pub mod thermal_profile;

pub use calibration::{CalibrationModel, CalibrationPoint, Medium};
pub use config::{
    AcquisitionConfig, CalibrationConfig, Config, DevicesConfig, LoggingConfig, OutputConfig,
    TriggerSemantics,
};
pub use sample::{Sample, ROW_HEADER};
pub use scan_state::ScanState;
pub use thermal_profile::ThermalProfile;
