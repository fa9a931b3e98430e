//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::calibrate::CalibrateArgs;
use super::commands::config::ConfigArgs;
use super::commands::convert::ConvertArgs;
use super::commands::scan::ScanArgs;

#[derive(Parser, Debug)]
#[command(name = "welltemp")]
#[command(about = "Well temperature logger", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read and persist configuration at this file instead of .welltemp/config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the edge-triggered acquisition loop
    Scan(ScanArgs),

    /// Collect calibration points and fit conversion coefficients
    Calibrate(CalibrateArgs),

    /// Convert one raw reading to temperature
    Convert(ConvertArgs),

    /// Inspect the resolved configuration
    Config(ConfigArgs),
}
