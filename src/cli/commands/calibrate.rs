//! Implementation of the `welltemp calibrate` command.
//!
//! Reads operator input from stdin, one line per action:
//! an empty line reads both instruments, `<raw> <reference>` records a
//! manual pair and `q` ends the session. Prompts and progress go to stderr.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::output::{detail_table, output, CommandOutput};
use crate::cli::CommandContext;
use crate::domain::models::{CalibrationPoint, Medium};
use crate::infrastructure::devices::build_device_set;
use crate::services::{
    CalibrationSession, CalibrationSummary, CoefficientStore, DeviceSession, FitOutcome,
};

#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// Medium to calibrate (defaults to the configured medium)
    #[arg(short, long)]
    pub medium: Option<Medium>,

    /// Use the simulated device set regardless of configuration
    #[arg(long)]
    pub simulate: bool,

    /// Write the fitted coefficients to the configuration file
    #[arg(long)]
    pub apply: bool,
}

#[derive(Debug, Serialize)]
pub struct CalibrateOutput {
    #[serde(flatten)]
    pub summary: CalibrationSummary,
    pub applied: bool,
}

impl CommandOutput for CalibrateOutput {
    fn to_human(&self) -> String {
        let summary = &self.summary;
        let mut rows = vec![
            ("session", summary.session_id.to_string()),
            ("medium", summary.medium.to_string()),
            ("points", summary.points.to_string()),
            ("fitted", summary.fitted.to_string()),
        ];
        rows.extend(
            summary
                .coefficients
                .iter()
                .zip(["a0", "a1", "a2", "a3"])
                .map(|(value, name)| (name, format!("{value:.6e}"))),
        );
        rows.push(("log", summary.log_path.display().to_string()));
        rows.push(("applied", self.applied.to_string()));
        detail_table(&rows).to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Parse a manual `<raw> <reference>` pair. Commas work as separators too.
pub fn parse_point(line: &str) -> Result<CalibrationPoint> {
    let fields: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .collect();
    let [raw, reference] = fields.as_slice() else {
        bail!("expected '<raw> <reference>', got '{line}'");
    };
    let raw: f64 = raw
        .parse()
        .with_context(|| format!("invalid raw reading '{raw}'"))?;
    let reference: f64 = reference
        .parse()
        .with_context(|| format!("invalid reference temperature '{reference}'"))?;
    Ok(CalibrationPoint::new(raw, reference))
}

/// One status line for the operator.
pub fn describe_outcome(outcome: &FitOutcome) -> String {
    match outcome {
        FitOutcome::Pending { points, required } => {
            format!("{points}/{required} points collected")
        }
        FitOutcome::Refit(result) => format!(
            "refit: {:?} (rms residual {:.4})",
            result.model.coefficients(),
            result.residual_rms
        ),
        FitOutcome::Failed { reason, .. } => {
            format!("fit failed ({reason}); keeping previous coefficients")
        }
    }
}

pub async fn execute(args: CalibrateArgs, ctx: &CommandContext) -> Result<()> {
    let config = ctx.config_with_devices(args.simulate);
    let medium = args.medium.unwrap_or(config.calibration.medium);
    let seed = config
        .calibration
        .model_for(medium)
        .context("Invalid calibration coefficients in configuration")?;

    let devices = DeviceSession::new(build_device_set(&config.devices));
    let store = CoefficientStore::new(seed.clone());
    let mut session = CalibrationSession::begin(
        &devices,
        seed,
        &config.output.calibration_directory,
        store.clone(),
        config.acquisition.sample_count,
    )
    .await
    .context("Failed to start calibration session")?;

    eprintln!(
        "Calibrating {medium}: Enter reads the instruments{}, '<raw> <reference>' adds a point, 'q' finishes.",
        if session.has_reference() { "" } else { " (no reference configured)" }
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            break;
        }
        let result = if line.is_empty() {
            session.trigger().await
        } else {
            match parse_point(line) {
                Ok(point) => session.record_point(point).await,
                Err(e) => {
                    eprintln!("{e:#}");
                    continue;
                }
            }
        };
        match result {
            Ok(outcome) => eprintln!("{}", describe_outcome(&outcome)),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    let summary = session.finish();
    let applied = args.apply && summary.fitted;
    if applied {
        let mut persisted = ctx.config.clone();
        persisted.calibration.apply(&store.current());
        ctx.persist(&persisted)
            .context("Failed to persist fitted coefficients")?;
    } else if args.apply {
        eprintln!("No fit was produced; configuration left unchanged.");
    }

    output(&CalibrateOutput { summary, applied }, ctx.json);
    Ok(())
}
