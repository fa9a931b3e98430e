//! Raw reading to temperature conversion.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CalibrationModel;

/// Convert a raw reading with `model`.
///
/// Air: `T = a + b ln(r)`. Water: `T = a + b ln(r) + c ln(r)^2 + d ln(r)^3`.
/// A non-positive or non-finite reading is outside the logarithm's domain
/// and yields [`DomainError::InvalidConversion`], as does a non-finite
/// result.
pub fn convert(model: &CalibrationModel, raw_value: f64) -> DomainResult<f64> {
    if !raw_value.is_finite() || raw_value <= 0.0 {
        return Err(DomainError::InvalidConversion(raw_value));
    }
    let temperature = model.evaluate_ln(raw_value.ln());
    if temperature.is_finite() {
        Ok(temperature)
    } else {
        Err(DomainError::InvalidConversion(raw_value))
    }
}

/// Converter bound to one model.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureConverter {
    model: CalibrationModel,
}

impl TemperatureConverter {
    pub const fn new(model: CalibrationModel) -> Self {
        Self { model }
    }

    pub const fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn convert(&self, raw_value: f64) -> DomainResult<f64> {
        convert(&self.model, raw_value)
    }
}
