//! Services: the acquisition controller and the calibration engine.

pub mod calibration_fitter;
pub mod calibration_session;
pub mod coefficient_store;
pub mod device_session;
pub mod edge_detector;
pub mod least_squares;
pub mod measurement_source;
pub mod scan_loop;
pub mod temperature_converter;

pub use calibration_fitter::{CalibrationFitter, FitOutcome, FitResult};
pub use calibration_session::{CalibrationSession, CalibrationSummary};
pub use coefficient_store::CoefficientStore;
pub use device_session::{DeviceLease, DeviceSession, DeviceSet};
pub use edge_detector::{EdgeDetector, EdgeWait};
pub use measurement_source::{Acquisition, MeasurementSource};
pub use scan_loop::{PlotBuffer, ScanController, ScanEvent, ScanReport, ScanSettings};
pub use temperature_converter::TemperatureConverter;
