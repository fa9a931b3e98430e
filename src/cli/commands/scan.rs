//! Implementation of the `welltemp scan` command.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::output::{detail_table, format_report_line, output, report_header, CommandOutput};
use crate::cli::CommandContext;
use crate::domain::models::ScanState;
use crate::infrastructure::devices::build_device_set;
use crate::services::{
    CoefficientStore, DeviceSession, ScanController, ScanEvent, ScanReport, ScanSettings,
};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Session identifier, part of the output file name
    #[arg(short, long)]
    pub session: String,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long)]
    pub duration_secs: Option<u64>,

    /// Use the simulated device set regardless of configuration
    #[arg(long)]
    pub simulate: bool,
}

#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub success: bool,
    pub state: ScanState,
    #[serde(flatten)]
    pub report: ScanReport,
}

impl CommandOutput for ScanOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let table = detail_table(&[
            ("session", report.session_id.clone()),
            ("run", report.run_id.to_string()),
            ("file", report.output_path.display().to_string()),
            ("state", self.state.to_string()),
            ("iterations", report.iterations.to_string()),
            ("samples", report.samples.to_string()),
            ("no trigger", report.no_trigger.to_string()),
            ("substituted", report.substituted.to_string()),
            ("invalid temp", report.invalid_conversions.to_string()),
            ("write failures", report.write_failures.to_string()),
        ]);
        format!("Scan finished.\n{table}")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ScanArgs, ctx: &CommandContext) -> Result<()> {
    let config = ctx.config_with_devices(args.simulate);
    let model = config
        .calibration
        .model()
        .context("Invalid calibration coefficients in configuration")?;

    let devices = DeviceSession::new(build_device_set(&config.devices));
    let mut controller = ScanController::new(
        ScanSettings::from_config(&config),
        devices,
        CoefficientStore::new(model),
    );
    let mut events = controller.subscribe();

    let path = controller
        .start(&args.session)
        .await
        .context("Failed to start scan")?;
    if !ctx.json {
        println!("Recording to {}", path.display());
        println!("{}", report_header());
    }

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            result = &mut interrupt => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for interrupt");
                }
                info!("interrupt received, stopping");
                break;
            }
            () = &mut deadline => {
                info!("scan duration elapsed, stopping");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(ScanEvent::Sample(sample)) => {
                        if !ctx.json {
                            println!("{}", format_report_line(&sample));
                        }
                    }
                    Ok(ScanEvent::Warning(message)) => {
                        if !ctx.json {
                            eprintln!("warning: {message}");
                        }
                    }
                    Ok(ScanEvent::StateChanged(ScanState::Stopped)) | Err(RecvError::Closed) => break,
                    Ok(ScanEvent::StateChanged(_) | ScanEvent::NoTrigger) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "console fell behind the scan loop");
                    }
                }
            }
        }
    }

    let report = controller.stop().await.context("Failed to stop scan")?;
    ctx.persist(&ctx.config)
        .context("Failed to persist configuration")?;

    let result = ScanOutput {
        success: true,
        state: controller.state().await,
        report,
    };
    output(&result, ctx.json);
    Ok(())
}
