//! Implementation of the `welltemp convert` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{detail_table, output, CommandOutput};
use crate::cli::CommandContext;
use crate::domain::models::Medium;
use crate::services::TemperatureConverter;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Raw probe reading in ohms
    #[arg(allow_negative_numbers = true)]
    pub raw: f64,

    /// Medium whose coefficients to use (defaults to the configured medium)
    #[arg(short, long)]
    pub medium: Option<Medium>,
}

#[derive(Debug, Serialize)]
pub struct ConvertOutput {
    pub medium: Medium,
    pub raw: f64,
    pub temperature: f64,
    pub coefficients: Vec<f64>,
}

impl CommandOutput for ConvertOutput {
    fn to_human(&self) -> String {
        detail_table(&[
            ("medium", self.medium.to_string()),
            ("raw", format!("{}", self.raw)),
            ("temperature", format!("{:.3}", self.temperature)),
            ("coefficients", format!("{:?}", self.coefficients)),
        ])
        .to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ConvertArgs, ctx: &CommandContext) -> Result<()> {
    let medium = args.medium.unwrap_or(ctx.config.calibration.medium);
    let model = ctx
        .config
        .calibration
        .model_for(medium)
        .context("Invalid calibration coefficients in configuration")?;
    let converter = TemperatureConverter::new(model);
    let temperature = converter
        .convert(args.raw)
        .with_context(|| format!("Cannot convert raw value {}", args.raw))?;

    let result = ConvertOutput {
        medium,
        raw: args.raw,
        temperature,
        coefficients: converter.model().coefficients().to_vec(),
    };
    output(&result, ctx.json);
    Ok(())
}
