/**
 * DEEPCHECK - Deep checklist test for networked attendance terminals
 *
 * ROLE: CLI glue around deepcheck-core: .env + flags, logging, device backend,
 * console banner, process exit code.
 *
 * EXIT CODES: 0 all good, 1 parallel or negative phase failed, 2 configuration error.
 */

mod cli;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use cli::Cli;
use deepcheck_core::orchestrator::EXIT_CONFIG_ERROR;
use deepcheck_core::{run_deepcheck, SharedConnector};
use deepcheck_devkit::FleetFixture;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.hosts().is_empty() {
        println!("Please provide device IPs with --ips or env ZK_IPS.");
        std::process::exit(EXIT_CONFIG_ERROR);
    }

    let connector = match build_connector(&cli).await {
        Ok(connector) => connector,
        Err(e) => {
            error!("{e:#}");
            eprintln!("[deepcheck] {e:#}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    println!("Deep Checklist Test start: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let ports = cli.port_list();
    println!(
        "Devices: {:?} | Ports: {}",
        cli.hosts(),
        if ports.is_empty() { "(auto)".to_string() } else { format!("{:?}", ports) }
    );

    let code = match run_deepcheck(connector, &cli.run_options()).await {
        Ok(outcome) => outcome.exit_code,
        Err(e) => {
            error!("configuration error: {}", e);
            println!("Configuration error: {}", e);
            EXIT_CONFIG_ERROR
        }
    };

    println!("\nDONE with exit code {}", code);
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();
}

/// The wire client for real terminals is an external collaborator; this
/// binary drives the simulated fleet described by a fixture file.
async fn build_connector(cli: &Cli) -> Result<SharedConnector> {
    let path = cli
        .fixtures
        .as_ref()
        .context("no device backend configured: pass --fixtures <fleet.yaml> or set DEEPCHECK_FIXTURES")?;
    let fleet = FleetFixture::load(path).await?.into_fleet();
    Ok(Arc::new(fleet))
}
