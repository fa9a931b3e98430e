//! Shared holder of the active conversion model.
//!
//! Backed by a `watch` channel: a publish swaps the whole model in one step,
//! and readers always see either the old or the new coefficient set.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::domain::models::CalibrationModel;

#[derive(Debug, Clone)]
pub struct CoefficientStore {
    tx: Arc<watch::Sender<CalibrationModel>>,
}

impl CoefficientStore {
    pub fn new(model: CalibrationModel) -> Self {
        let (tx, _rx) = watch::channel(model);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the active model.
    pub fn current(&self) -> CalibrationModel {
        self.tx.borrow().clone()
    }

    /// Replace the active model.
    pub fn publish(&self, model: CalibrationModel) {
        info!(
            medium = %model.medium(),
            coefficients = ?model.coefficients(),
            "conversion coefficients updated"
        );
        self.tx.send_replace(model);
    }

    pub fn subscribe(&self) -> watch::Receiver<CalibrationModel> {
        self.tx.subscribe()
    }
}
