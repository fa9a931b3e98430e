//! Device adapters.
//!
//! Real adapters speak SCPI over a raw TCP socket and read the trigger line
//! from a GPIO value file. The simulated set follows a deterministic thermal
//! profile. Which set is used is decided once, from `devices.mode`.

pub mod gpio;
pub mod scpi;
pub mod simulated;

use std::time::Duration;

pub use gpio::GpioSignalLine;
pub use scpi::ScpiInstrument;
pub use simulated::{SimulatedInstrument, SimulatedSignalLine};

use crate::domain::models::{DevicesConfig, ThermalProfile};
use crate::domain::ports::DeviceKind;
use crate::services::DeviceSet;

/// Build the device set selected by configuration.
pub fn build_device_set(config: &DevicesConfig) -> DeviceSet {
    match config.mode {
        DeviceKind::Simulated => simulated_device_set(ThermalProfile::default()),
        DeviceKind::Real => {
            let timeout = Duration::from_millis(config.io_timeout_ms);
            let set = DeviceSet::new(
                Box::new(ScpiInstrument::new(
                    "measurement",
                    &config.instrument_address,
                    timeout,
                )),
                Box::new(GpioSignalLine::new(
                    config.signal_line_path.clone(),
                    config.active_low,
                )),
            );
            match &config.reference_address {
                Some(address) => set.with_reference(Box::new(ScpiInstrument::new(
                    "reference", address, timeout,
                ))),
                None => set,
            }
        }
    }
}

/// Simulated probe, reference and trigger line sharing one profile.
pub fn simulated_device_set(profile: ThermalProfile) -> DeviceSet {
    DeviceSet::new(
        Box::new(SimulatedInstrument::probe(profile)),
        Box::new(SimulatedSignalLine),
    )
    .with_reference(Box::new(SimulatedInstrument::reference(profile)))
}
