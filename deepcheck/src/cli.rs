//! Command line surface
//!
//! Flags fall back to the same environment variables the field scripts use
//! (`ZK_IPS`, `ZK_PORTS`), so a `.env` next to the binary is enough.

use clap::Parser;
use deepcheck_core::RunOptions;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Reported in the run's env snapshot, never interpreted here.
pub const SNAPSHOT_VARS: &[&str] = &["ZK_SKIP_PING"];

#[derive(Debug, Parser)]
#[command(name = "deepcheck")]
#[command(about = "Deep checklist test for networked attendance terminals")]
pub struct Cli {
    /// Devices, comma separated, `ip` or `ip:port`. Example: 192.168.1.10,192.168.1.11:5005
    #[arg(long, env = "ZK_IPS", default_value = "")]
    pub ips: String,

    /// Ports, comma separated. One value applies to every device; otherwise one per device.
    /// When empty, ports come from `ip:port` or default to 4370
    #[arg(long, env = "ZK_PORTS", default_value = "")]
    pub ports: String,

    /// Pull attendance from all devices at once
    #[arg(long)]
    pub parallel: bool,

    /// Known-bad endpoint for the negative check, `ip` or `ip:port`
    #[arg(long = "bad-ip")]
    pub bad_ip: Option<String>,

    /// Save one attendance CSV per device
    #[arg(long = "save-csv")]
    pub save_csv: bool,

    /// Directory for CSV files (default: system temp dir)
    #[arg(long = "csv-dir", env = "DEEPCHECK_CSV_DIR")]
    pub csv_dir: Option<PathBuf>,

    /// Path of the JSON report, e.g. /tmp/deepcheck.json
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Fleet fixture (YAML) backing the simulated device client
    #[arg(long, env = "DEEPCHECK_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn hosts(&self) -> Vec<&str> {
        self.ips.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
    }

    pub fn port_list(&self) -> Vec<&str> {
        self.ports.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
    }

    pub fn run_options(&self) -> RunOptions {
        let defaults = RunOptions::default();
        RunOptions {
            ips: self.ips.clone(),
            ports: self.ports.clone(),
            parallel: self.parallel,
            bad_endpoint: self.bad_ip.clone().filter(|s| !s.trim().is_empty()),
            save_csv: self.save_csv,
            csv_dir: self.csv_dir.clone().unwrap_or(defaults.csv_dir),
            report_path: self.report.clone(),
            env: env_snapshot(),
        }
    }
}

pub fn env_snapshot() -> BTreeMap<String, Option<String>> {
    SNAPSHOT_VARS
        .iter()
        .map(|name| (name.to_string(), std::env::var(name).ok()))
        .collect()
}
