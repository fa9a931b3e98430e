//! Domain layer for the well temperature logger
//!
//! Pure models, the error taxonomy and the device/recorder ports. Nothing in
//! here touches the filesystem, the clock or a device directly.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
