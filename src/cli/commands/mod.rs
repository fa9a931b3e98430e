//! CLI command implementations.

pub mod calibrate;
pub mod config;
pub mod convert;
pub mod scan;
