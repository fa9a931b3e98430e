//! Exclusive ownership of the device set.
//!
//! The scan loop and a calibration session both need the instrument and the
//! trigger line. Whoever wants them checks the set out and gets a
//! [`DeviceLease`]; the set goes back when the lease is dropped. A checkout
//! while the set is leased fails with [`DomainError::DeviceBusy`].

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{DeviceKind, MeasurementInstrument, SignalLine};

/// The adapters one flow needs to take readings.
pub struct DeviceSet {
    pub instrument: Box<dyn MeasurementInstrument>,
    pub signal: Box<dyn SignalLine>,
    /// Reference instrument used during calibration.
    pub reference: Option<Box<dyn MeasurementInstrument>>,
}

impl std::fmt::Debug for DeviceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSet")
            .field("instrument", &self.instrument.name())
            .field("signal", &self.signal.name())
            .field("reference", &self.reference.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}

impl DeviceSet {
    pub fn new(
        instrument: Box<dyn MeasurementInstrument>,
        signal: Box<dyn SignalLine>,
    ) -> Self {
        Self {
            instrument,
            signal,
            reference: None,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Box<dyn MeasurementInstrument>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// `Simulated` if any adapter is simulated.
    pub fn kind(&self) -> DeviceKind {
        if self.instrument.kind().is_simulated() || self.signal.kind().is_simulated() {
            DeviceKind::Simulated
        } else {
            DeviceKind::Real
        }
    }

    /// Open the trigger line and the measurement instrument, then apply the
    /// sample-count setting.
    pub async fn open_for_scan(&mut self, sample_count: u32) -> DomainResult<()> {
        if !self.signal.open().await {
            return Err(DomainError::DeviceUnavailable(format!(
                "failed to connect to signal line {}",
                self.signal.name()
            )));
        }
        open_instrument(self.instrument.as_mut(), sample_count).await
    }

    /// Open the measurement instrument and, when present, the reference.
    pub async fn open_for_calibration(&mut self, sample_count: u32) -> DomainResult<()> {
        open_instrument(self.instrument.as_mut(), sample_count).await?;
        if let Some(reference) = self.reference.as_mut() {
            open_instrument(reference.as_mut(), sample_count).await?;
        }
        Ok(())
    }
}

async fn open_instrument(
    instrument: &mut dyn MeasurementInstrument,
    sample_count: u32,
) -> DomainResult<()> {
    if !instrument.open().await {
        return Err(DomainError::DeviceUnavailable(format!(
            "failed to connect to instrument {}",
            instrument.name()
        )));
    }
    if let Err(e) = instrument.configure(sample_count).await {
        warn!(instrument = instrument.name(), error = %e, "instrument configuration failed");
        return Err(DomainError::DeviceUnavailable(format!(
            "failed to configure instrument {}: {e}",
            instrument.name()
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Slot {
    devices: Option<DeviceSet>,
    holder: Option<String>,
}

/// Home of the device set between leases.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    slot: Arc<Mutex<Slot>>,
}

impl DeviceSession {
    pub fn new(devices: DeviceSet) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                devices: Some(devices),
                holder: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the device set for `holder`.
    pub fn checkout(&self, holder: &str) -> DomainResult<DeviceLease> {
        let mut slot = self.lock();
        match slot.devices.take() {
            Some(devices) => {
                slot.holder = Some(holder.to_string());
                info!(holder, "devices checked out");
                Ok(DeviceLease {
                    devices: Some(devices),
                    holder: holder.to_string(),
                    home: Arc::clone(&self.slot),
                })
            }
            None => Err(DomainError::DeviceBusy {
                holder: slot.holder.clone().unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }

    /// Current lease holder, if any.
    pub fn holder(&self) -> Option<String> {
        self.lock().holder.clone()
    }

    pub fn is_available(&self) -> bool {
        self.lock().devices.is_some()
    }
}

/// Checked-out device set. Returns the set to its session on drop.
pub struct DeviceLease {
    devices: Option<DeviceSet>,
    holder: String,
    home: Arc<Mutex<Slot>>,
}

impl DeviceLease {
    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl std::fmt::Debug for DeviceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLease")
            .field("holder", &self.holder)
            .field("devices", &self.devices)
            .finish()
    }
}

impl Deref for DeviceLease {
    type Target = DeviceSet;

    fn deref(&self) -> &DeviceSet {
        // Only `Drop` takes the set out.
        self.devices.as_ref().unwrap_or_else(|| unreachable!("lease already returned"))
    }
}

impl DerefMut for DeviceLease {
    fn deref_mut(&mut self) -> &mut DeviceSet {
        self.devices.as_mut().unwrap_or_else(|| unreachable!("lease already returned"))
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        if let Some(devices) = self.devices.take() {
            let mut slot = self.home.lock().unwrap_or_else(PoisonError::into_inner);
            slot.devices = Some(devices);
            slot.holder = None;
            debug!(holder = %self.holder, "devices returned");
        }
    }
}
