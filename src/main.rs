//! Welltemp CLI entry point.

use clap::Parser;

use welltemp::cli::{handle_error, Cli, CommandContext, Commands};
use welltemp::infrastructure::config::{ConfigLoader, CONFIG_DIR};
use welltemp::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (figment, config_path) = match &cli.config {
        Some(path) => (ConfigLoader::figment_for_file(path), path.clone()),
        None => (
            ConfigLoader::figment_for_dir(CONFIG_DIR),
            ConfigLoader::config_path(CONFIG_DIR),
        ),
    };
    let config = match ConfigLoader::extract(&figment) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let logger = match LogConfig::from_settings(&config.logging).and_then(|c| LoggerImpl::init(&c))
    {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };
    ConfigLoader::report_unknown(&figment);

    let ctx = CommandContext::new(config, config_path, cli.json);
    let result = match cli.command {
        Commands::Scan(args) => welltemp::cli::commands::scan::execute(args, &ctx).await,
        Commands::Calibrate(args) => welltemp::cli::commands::calibrate::execute(args, &ctx).await,
        Commands::Convert(args) => welltemp::cli::commands::convert::execute(args, &ctx).await,
        Commands::Config(args) => welltemp::cli::commands::config::execute(args, &ctx).await,
    };

    if let Err(err) = result {
        // Flush the file writer before exiting.
        drop(logger);
        handle_error(err, ctx.json);
    }
}
