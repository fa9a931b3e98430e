//! Calibration media, points and conversion models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::{DomainError, DomainResult};

/// Bootstrap coefficients for air, `T = a + b ln(r)`.
pub const AIR_BOOTSTRAP: [f64; 2] = [232.2, -22.5];

/// Bootstrap coefficients for water, `T = a + b ln(r) + c ln(r)^2 + d ln(r)^3`.
pub const WATER_BOOTSTRAP: [f64; 4] = [230.0, -22.0, -0.01, 0.0005];

/// Physical medium the probe sits in. Selects the conversion model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    #[default]
    Air,
    Water,
}

impl Medium {
    /// Number of model coefficients.
    pub const fn parameter_count(self) -> usize {
        match self {
            Self::Air => 2,
            Self::Water => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Water => "water",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Medium {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "air" | "a" => Ok(Self::Air),
            "water" | "b" => Ok(Self::Water),
            other => Err(format!("unknown medium '{other}', expected air or water")),
        }
    }
}

/// One reference/measured pair collected during a calibration session.
///
/// `reference_x` is the raw probe reading at the reference condition and is
/// the model's independent variable; `measured_y` is the temperature reported
/// for that condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub reference_x: f64,
    pub measured_y: f64,
}

impl CalibrationPoint {
    pub const fn new(reference_x: f64, measured_y: f64) -> Self {
        Self {
            reference_x,
            measured_y,
        }
    }
}

/// Conversion model: medium plus its full coefficient set.
///
/// Construction checks the coefficient count, so a model is never observed
/// with a partial set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    medium: Medium,
    coefficients: Vec<f64>,
}

impl CalibrationModel {
    /// Build a model, rejecting a coefficient set of the wrong length or with
    /// non-finite entries.
    pub fn new(medium: Medium, coefficients: Vec<f64>) -> DomainResult<Self> {
        if coefficients.len() != medium.parameter_count() {
            return Err(DomainError::FitFailure(format!(
                "{medium} model takes {} coefficients, got {}",
                medium.parameter_count(),
                coefficients.len()
            )));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(DomainError::FitFailure(format!(
                "{medium} coefficients are not finite: {coefficients:?}"
            )));
        }
        Ok(Self {
            medium,
            coefficients,
        })
    }

    /// Fixed constants used until a fit succeeds.
    pub fn bootstrap(medium: Medium) -> Self {
        let coefficients = match medium {
            Medium::Air => AIR_BOOTSTRAP.to_vec(),
            Medium::Water => WATER_BOOTSTRAP.to_vec(),
        };
        Self {
            medium,
            coefficients,
        }
    }

    pub const fn medium(&self) -> Medium {
        self.medium
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluate the polynomial in `ln_x` (Horner form).
    pub fn evaluate_ln(&self, ln_x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc.mul_add(ln_x, *c))
    }
}
