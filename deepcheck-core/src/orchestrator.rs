//! Run orchestration
//!
//! RESOLVE -> per endpoint (CONNECT -> USERS -> ATTENDANCE -> FALLBACK -> [CSV])
//! -> [PARALLEL] -> [NEGATIVE] -> WRITE_REPORT
//!
//! Per-device failures are printed and recorded but never change the exit
//! code. Only the parallel and negative phases can fail the run.

use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info};

use crate::checks::{attendance_check, connect_check, negative_check, users_check, NegativeResult, TailEntry};
use crate::device::{Connector, SharedConnector};
use crate::endpoints::{parse_endpoint, resolve_endpoints};
use crate::error::ConfigError;
use crate::fallback::{build_directory, fallback_check};
use crate::models::Endpoint;
use crate::parallel::{run_parallel, ParallelEntry, ParallelResult};
use crate::report::{write_attendance_csv, DeviceRunRecord, Report};

pub const EXIT_OK: i32 = 0;
pub const EXIT_CHECK_FAILED: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Comma-separated `host` / `host:port` tokens.
    pub ips: String,
    /// Comma-separated ports, may be empty.
    pub ports: String,
    pub parallel: bool,
    pub bad_endpoint: Option<String>,
    pub save_csv: bool,
    pub csv_dir: PathBuf,
    pub report_path: Option<PathBuf>,
    /// Environment snapshot copied verbatim into the report.
    pub env: BTreeMap<String, Option<String>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ips: String::new(),
            ports: String::new(),
            parallel: false,
            bad_endpoint: None,
            save_csv: false,
            csv_dir: std::env::temp_dir(),
            report_path: None,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub exit_code: i32,
}

pub fn pass_fail(pass: bool) -> &'static str {
    if pass { "PASS" } else { "FAIL" }
}

/// Execute a complete run. Configuration problems are returned before any
/// device is contacted; everything else ends up in the report.
pub async fn run_deepcheck(connector: SharedConnector, options: &RunOptions) -> Result<RunOutcome, ConfigError> {
    let endpoints = resolve_endpoints(&options.ips, &options.ports)?;
    let bad_endpoint = options
        .bad_endpoint
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_endpoint)
        .transpose()?;

    let started_at = Local::now().naive_local();
    let mut report = Report::new(&started_at, &endpoints, options.env.clone());
    let mut exit_code = EXIT_OK;
    info!("deep check started for {} endpoint(s)", endpoints.len());

    for endpoint in &endpoints {
        let record = check_device(connector.as_ref(), endpoint, options).await;
        report.record_device(endpoint, record);
    }

    if options.parallel {
        if let Some(result) = run_parallel(connector.clone(), &endpoints).await {
            print_parallel(&result);
            if !result.pass {
                exit_code = EXIT_CHECK_FAILED;
            }
            report.parallel = Some(result);
        } else {
            info!("parallel phase skipped: needs at least two endpoints");
        }
    }

    if let Some(bad) = bad_endpoint {
        let result = negative_check(connector.as_ref(), &bad).await;
        print_negative(&result);
        if !result.pass {
            exit_code = EXIT_CHECK_FAILED;
        }
        report.negative = Some(result);
    }

    if let Some(path) = &options.report_path {
        match report.write_json(path) {
            Ok(()) => println!("\nReport JSON -> {}", path.display()),
            Err(e) => {
                error!("{}", e);
                println!("\nReport JSON not written: {}", e);
            }
        }
    }

    info!("deep check finished with exit code {}", exit_code);
    Ok(RunOutcome { report, exit_code })
}

async fn check_device(connector: &dyn Connector, endpoint: &Endpoint, options: &RunOptions) -> DeviceRunRecord {
    println!("\n=== DEVICE {} ===", endpoint);

    let connect = connect_check(connector, endpoint).await;
    println!(
        "[1] Connect           : {}{}",
        pass_fail(connect.pass),
        if connect.pass { String::new() } else { format!(" | {}", connect.error) }
    );

    let users = users_check(connector, endpoint).await;
    let user_count = users.result.info.as_ref().map_or(0, |i| i.count);
    println!("[2] get_users()       : {} | count={}", pass_fail(users.result.pass), user_count);
    if !users.result.pass {
        println!("    error: {}", users.result.error);
    }

    let attendance = attendance_check(connector, endpoint).await;
    let (records, unique) = attendance
        .result
        .info
        .as_ref()
        .map_or((0, 0), |i| (i.summary.count, i.summary.unique_users));
    println!(
        "[3] get_attendance()  : {} | records={} unique_users={}",
        pass_fail(attendance.result.pass),
        records,
        unique
    );
    if let Some(info) = &attendance.result.info {
        for TailEntry(user_id, ts, (status, punch), uid) in &info.tail {
            println!(
                "    tail: user_id={} ts={} status/punch=({}, {}) uid={}",
                user_id,
                ts.as_deref().unwrap_or("None"),
                status,
                punch,
                uid
            );
        }
    }
    if !attendance.result.pass {
        println!("    error: {}", attendance.result.error);
    }

    let fallback = (users.result.pass && attendance.result.pass).then(|| {
        let directory = build_directory(&users.users);
        fallback_check(&directory, &attendance.records)
    });
    if let Some(info) = fallback.as_ref().and_then(|f| f.info.as_ref()) {
        println!("[F] fallback user_id  : PASS | fallback_count={}", info.fallback_count);
    }

    let mut csv = String::new();
    if options.save_csv && attendance.result.pass {
        let run_at: NaiveDateTime = Local::now().naive_local();
        match write_attendance_csv(&options.csv_dir, endpoint, &attendance.records, &run_at) {
            Ok(Some(path)) => {
                csv = path.display().to_string();
                println!("[4] CSV               : saved -> {}", csv);
            }
            Ok(None) => {}
            Err(e) => {
                error!("CSV for {} not written: {}", endpoint, e);
                println!("[4] CSV               : FAIL | {}", e);
            }
        }
    }

    DeviceRunRecord {
        connect,
        users: users.result,
        attendance: attendance.result,
        fallback,
        csv,
    }
}

fn print_parallel(result: &ParallelResult) {
    println!("\n=== PARALLEL ===");
    println!("[P] Parallel pull     : {}", pass_fail(result.pass));
    if let Some(info) = &result.info {
        for (key, entry) in &info.devices {
            match entry {
                ParallelEntry::Pulled { duration_sec, records } => {
                    println!("    {}: duration={}s records={}", key, duration_sec, records)
                }
                ParallelEntry::Failed { error } => println!("    {}: ERROR {}", key, error),
            }
        }
    }
}

fn print_negative(result: &NegativeResult) {
    println!("\n=== NEGATIVE ===");
    println!(
        "[N] Bad {} : {}{}",
        result.endpoint,
        pass_fail(result.pass),
        if result.error.is_empty() { String::new() } else { format!(" | {}", result.error) }
    );
}
