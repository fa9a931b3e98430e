//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Device adapters (SCPI instrument, GPIO trigger line, simulated set)
//! - Session and calibration file recorders
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod devices;
pub mod logging;
pub mod recorder;
