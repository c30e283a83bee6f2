//! kspawn CLI Binary
//!
//! Command-line interface for kube-spawn cluster configuration.

use clap::Parser;
use kspawn::cli::{Cli, RunContext};
use kspawn::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!(cluster = %cli.cluster_name, dir = %cli.dir.display(), "kspawn starting");

    let context = RunContext::new(cli.dir.clone(), cli.cluster_name.clone());
    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", kspawn::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args. Environment variables are applied
/// on top by `init_logging`.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = LoggingConfig::default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}
