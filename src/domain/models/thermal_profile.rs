//! Deterministic thermal profile used wherever a reading must be simulated.
//!
//! The probe is modelled as an NTC thermistor whose resistance follows
//! `R = R0 * exp(-(T - T0) / k)`, which is exactly invertible by the air
//! bootstrap model. Temperature swings sinusoidally with the sample index.

use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalProfile {
    /// Centre temperature in degrees C.
    pub base_temperature: f64,
    /// Peak deviation from the centre.
    pub amplitude: f64,
    /// Samples per full swing.
    pub period_samples: f64,
    /// Resistance at 25 C in ohms.
    pub nominal_resistance: f64,
    /// Degrees per natural-log unit of resistance.
    pub slope: f64,
}

impl Default for ThermalProfile {
    fn default() -> Self {
        Self {
            base_temperature: 25.0,
            amplitude: 5.0,
            period_samples: 120.0,
            nominal_resistance: 10_000.0,
            slope: 22.5,
        }
    }
}

impl ThermalProfile {
    pub fn temperature_at(&self, index: u64) -> f64 {
        let phase = TAU * index as f64 / self.period_samples;
        self.amplitude.mul_add(phase.sin(), self.base_temperature)
    }

    pub fn resistance_at(&self, index: u64) -> f64 {
        self.resistance_for(self.temperature_at(index))
    }

    pub fn resistance_for(&self, temperature: f64) -> f64 {
        self.nominal_resistance * (-(temperature - 25.0) / self.slope).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CalibrationModel, Medium};

    #[test]
    fn test_resistance_is_positive_across_a_period() {
        let profile = ThermalProfile::default();
        for i in 0..240 {
            assert!(profile.resistance_at(i) > 0.0);
        }
    }

    #[test]
    fn test_air_bootstrap_inverts_profile() {
        let profile = ThermalProfile::default();
        let model = CalibrationModel::bootstrap(Medium::Air);
        for i in [0, 17, 30, 90] {
            let t = model.evaluate_ln(profile.resistance_at(i).ln());
            assert!((t - profile.temperature_at(i)).abs() < 0.05, "sample {i}");
        }
    }
}
