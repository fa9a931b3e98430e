//! Calibration curve fitting.
//!
//! Both media use a polynomial in `ln(x)`, so the fit is a linear least
//! squares problem over the basis `{1, ln x, ln^2 x, ln^3 x}`. The log values
//! are centred and scaled to `[-1, 1]` before solving and the coefficients
//! are expanded back to the raw `ln x` basis afterwards; without this the
//! water basis is too ill-conditioned for probes with a narrow range.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

use super::least_squares;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CalibrationModel, CalibrationPoint, Medium};

/// Samples in a preview curve.
pub const PREVIEW_POINTS: usize = 50;

/// Fractional padding of the preview range beyond the observed `x` range.
pub const PREVIEW_MARGIN: f64 = 0.1;

/// A successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub model: CalibrationModel,
    /// `(x, model(x))` over the padded observed range. Display only.
    pub preview: Vec<(f64, f64)>,
    pub residual_rms: f64,
}

/// What adding a point did to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// Not enough points to leave a residual degree of freedom.
    Pending { points: usize, required: usize },
    /// The model was refit and replaced.
    Refit(FitResult),
    /// The fit failed; `retained` is still the active model.
    Failed {
        reason: String,
        retained: CalibrationModel,
    },
}

/// Fit `medium`'s model to `points`.
pub fn fit(medium: Medium, points: &[CalibrationPoint]) -> DomainResult<CalibrationModel> {
    let p = medium.parameter_count();
    if points.len() < p {
        return Err(DomainError::FitFailure(format!(
            "{} points cannot determine {p} coefficients",
            points.len()
        )));
    }

    let logs: Vec<f64> = points.iter().map(|pt| pt.reference_x.ln()).collect();
    if logs.iter().any(|l| !l.is_finite()) {
        return Err(DomainError::FitFailure(
            "reference values must be positive".to_string(),
        ));
    }

    let centre = logs.iter().sum::<f64>() / logs.len() as f64;
    let half_range = logs.iter().map(|l| (l - centre).abs()).fold(0.0, f64::max);
    if half_range < 1e-12 * centre.abs().max(1.0) {
        return Err(DomainError::FitFailure(
            "all reference values are identical".to_string(),
        ));
    }

    let design = DMatrix::from_fn(logs.len(), p, |i, j| {
        ((logs[i] - centre) / half_range).powi(j as i32)
    });
    let y = DVector::from_iterator(points.len(), points.iter().map(|pt| pt.measured_y));

    let scaled = least_squares::solve(design, &y)?;
    CalibrationModel::new(medium, expand_coefficients(scaled.as_slice(), centre, half_range))
}

/// Rewrite `sum q_j ((l - m) / h)^j` as `sum c_i l^i`.
fn expand_coefficients(scaled: &[f64], centre: f64, half_range: f64) -> Vec<f64> {
    let p = scaled.len();
    let mut out = vec![0.0; p];
    for (j, q) in scaled.iter().enumerate() {
        let factor = q / half_range.powi(j as i32);
        let mut binomial = 1.0;
        for (i, slot) in out.iter_mut().enumerate().take(j + 1) {
            if i > 0 {
                binomial = binomial * (j + 1 - i) as f64 / i as f64;
            }
            *slot += factor * binomial * (-centre).powi((j - i) as i32);
        }
    }
    out
}

/// Evenly spaced `(x, model(x))` over `[0.9 min(x), 1.1 max(x)]`.
pub fn preview_curve(
    model: &CalibrationModel,
    points: &[CalibrationPoint],
    count: usize,
) -> Vec<(f64, f64)> {
    let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), pt| {
        (lo.min(pt.reference_x), hi.max(pt.reference_x))
    });
    if points.is_empty() || count == 0 {
        return Vec::new();
    }

    let lo = min * (1.0 - PREVIEW_MARGIN);
    let hi = max * (1.0 + PREVIEW_MARGIN);
    let step = if count > 1 {
        (hi - lo) / (count - 1) as f64
    } else {
        0.0
    };

    (0..count)
        .map(|i| {
            let x = step.mul_add(i as f64, lo);
            (x, model.evaluate_ln(x.ln()))
        })
        .collect()
}

/// Root-mean-square residual of `model` over `points`.
pub fn residual_rms(model: &CalibrationModel, points: &[CalibrationPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sum: f64 = points
        .iter()
        .map(|pt| {
            let r = model.evaluate_ln(pt.reference_x.ln()) - pt.measured_y;
            r * r
        })
        .sum();
    (sum / points.len() as f64).sqrt()
}

/// Accumulates calibration points for one session and keeps the last good
/// model.
#[derive(Debug, Clone)]
pub struct CalibrationFitter {
    points: Vec<CalibrationPoint>,
    model: CalibrationModel,
    fitted: bool,
    preview: Vec<(f64, f64)>,
}

impl CalibrationFitter {
    /// Start a session; `seed` is active until the first successful fit and
    /// fixes the medium.
    pub const fn new(seed: CalibrationModel) -> Self {
        Self {
            points: Vec::new(),
            model: seed,
            fitted: false,
            preview: Vec::new(),
        }
    }

    pub const fn medium(&self) -> Medium {
        self.model.medium()
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Last successful model, or the seed.
    pub const fn model(&self) -> &CalibrationModel {
        &self.model
    }

    /// Whether any fit has succeeded this session.
    pub const fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn preview(&self) -> &[(f64, f64)] {
        &self.preview
    }

    /// Append a point and refit once there are more points than
    /// coefficients.
    ///
    /// A point outside the model domain (non-positive or non-finite `x`, or
    /// non-finite `y`) is rejected and not appended.
    pub fn add_point(&mut self, point: CalibrationPoint) -> DomainResult<FitOutcome> {
        if !point.reference_x.is_finite() || point.reference_x <= 0.0 {
            return Err(DomainError::InvalidConversion(point.reference_x));
        }
        if !point.measured_y.is_finite() {
            return Err(DomainError::InvalidConversion(point.measured_y));
        }

        self.points.push(point);
        let required = self.medium().parameter_count() + 1;
        debug!(
            x = point.reference_x,
            y = point.measured_y,
            points = self.points.len(),
            "calibration point added"
        );

        if self.points.len() < required {
            return Ok(FitOutcome::Pending {
                points: self.points.len(),
                required,
            });
        }

        match fit(self.medium(), &self.points) {
            Ok(model) => {
                let preview = preview_curve(&model, &self.points, PREVIEW_POINTS);
                let residual_rms = residual_rms(&model, &self.points);
                info!(
                    medium = %model.medium(),
                    coefficients = ?model.coefficients(),
                    residual_rms,
                    "calibration refit"
                );
                self.model = model.clone();
                self.preview = preview.clone();
                self.fitted = true;
                Ok(FitOutcome::Refit(FitResult {
                    model,
                    preview,
                    residual_rms,
                }))
            }
            Err(e) => {
                warn!(error = %e, "calibration fit failed, keeping previous coefficients");
                Ok(FitOutcome::Failed {
                    reason: e.to_string(),
                    retained: self.model.clone(),
                })
            }
        }
    }
}
