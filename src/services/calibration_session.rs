//! Operator-run calibration session.
//!
//! Holds the device lease for its whole life, so a scan cannot start while
//! calibration is in progress (and the other way round). Each trigger reads
//! the probe instrument and the reference instrument, logs the pair, and
//! refits. Successful fits are published to the [`CoefficientStore`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use super::calibration_fitter::{CalibrationFitter, FitOutcome};
use super::coefficient_store::CoefficientStore;
use super::device_session::{DeviceLease, DeviceSession};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CalibrationModel, CalibrationPoint, Medium};
use crate::domain::ports::READ_COMMAND;
use crate::infrastructure::recorder::CalibrationLog;

/// Lease holder name used by calibration sessions.
pub const CALIBRATION_HOLDER: &str = "calibration";

/// Summary handed back by [`CalibrationSession::finish`].
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationSummary {
    pub session_id: Uuid,
    pub medium: Medium,
    pub points: usize,
    pub fitted: bool,
    pub coefficients: Vec<f64>,
    pub log_path: PathBuf,
}

#[derive(Debug)]
pub struct CalibrationSession {
    id: Uuid,
    fitter: CalibrationFitter,
    log: CalibrationLog,
    lease: DeviceLease,
    store: CoefficientStore,
}

impl CalibrationSession {
    /// Check out the devices, open the instruments and create the point log.
    ///
    /// `seed` is the active model until the first successful fit and fixes
    /// the medium.
    pub async fn begin(
        devices: &DeviceSession,
        seed: CalibrationModel,
        log_dir: &Path,
        store: CoefficientStore,
        sample_count: u32,
    ) -> DomainResult<Self> {
        let mut lease = devices.checkout(CALIBRATION_HOLDER)?;
        lease.open_for_calibration(sample_count).await?;

        let id = Uuid::new_v4();
        let log = CalibrationLog::create(log_dir, seed.medium(), id).await?;
        info!(session = %id, medium = %seed.medium(), "calibration session started");

        Ok(Self {
            id,
            fitter: CalibrationFitter::new(seed),
            log,
            lease,
            store,
        })
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn fitter(&self) -> &CalibrationFitter {
        &self.fitter
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    pub fn has_reference(&self) -> bool {
        self.lease.reference.is_some()
    }

    /// Read both instruments and record the pair.
    ///
    /// Read failures are returned to the operator; calibration never
    /// substitutes simulated values into a fit.
    pub async fn trigger(&mut self) -> DomainResult<FitOutcome> {
        let Some(reference) = self.lease.reference.as_mut() else {
            return Err(DomainError::DeviceUnavailable(
                "no reference instrument configured".to_string(),
            ));
        };
        let measured_y = reference.query(READ_COMMAND).await?;
        let reference_x = self.lease.instrument.query(READ_COMMAND).await?;

        self.record_point(CalibrationPoint::new(reference_x, measured_y))
            .await
    }

    /// Record an operator-entered pair.
    pub async fn record_point(&mut self, point: CalibrationPoint) -> DomainResult<FitOutcome> {
        let outcome = self.fitter.add_point(point)?;

        if let Err(e) = self.log.append(&point).await {
            warn!(error = %e, path = %self.log.path().display(), "calibration point not logged");
        }

        match &outcome {
            FitOutcome::Refit(result) => self.store.publish(result.model.clone()),
            FitOutcome::Failed { reason, .. } => {
                warn!(session = %self.id, reason = %reason, "refit failed, coefficients unchanged");
            }
            FitOutcome::Pending { points, required } => {
                info!(points, required, "collecting calibration points");
            }
        }
        Ok(outcome)
    }

    /// End the session and return the devices.
    pub fn finish(self) -> CalibrationSummary {
        let model = self.fitter.model();
        let summary = CalibrationSummary {
            session_id: self.id,
            medium: model.medium(),
            points: self.fitter.points().len(),
            fitted: self.fitter.is_fitted(),
            coefficients: model.coefficients().to_vec(),
            log_path: self.log.path().to_path_buf(),
        };
        info!(
            session = %self.id,
            points = summary.points,
            fitted = summary.fitted,
            "calibration session finished"
        );
        summary
    }
}
