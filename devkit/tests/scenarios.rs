//! End-to-end scenarios: the deepcheck engine against an in-memory fleet.

use deepcheck_core::checks::{attendance_check, connect_check, negative_check, users_check, NEGATIVE_CONNECTED};
use deepcheck_core::orchestrator::{EXIT_CHECK_FAILED, EXIT_OK};
use deepcheck_core::parallel::{run_parallel, ParallelEntry};
use deepcheck_core::{run_deepcheck, ConfigError, Endpoint, RunOptions, SharedConnector};
use deepcheck_devkit::{record, user, MockDevice, MockFleet};
use std::sync::Arc;
use std::time::Duration;

fn ep(host: &str) -> Endpoint {
    Endpoint::new(host, 4370)
}

fn shared(fleet: &MockFleet) -> SharedConnector {
    Arc::new(fleet.clone())
}

fn healthy_device() -> MockDevice {
    MockDevice::new()
        .with_users(vec![user(1, "1001", "Ayu"), user(8, "A1", "Budi")])
        .with_attendance(vec![
            record(8, "A1", "2024-05-01 09:00:00"),
            record(7, "7", "2024-05-01 08:00:00"),
            record(1, "1001", "2024-05-01 17:00:00"),
        ])
}

#[tokio::test]
async fn connect_check_reports_device_message() {
    let fleet = MockFleet::new()
        .with_device(&ep("10.0.0.1"), MockDevice::new())
        .with_device(&ep("10.0.0.2"), MockDevice::new().failing_connect("timed out"));

    let ok = connect_check(&fleet, &ep("10.0.0.1")).await;
    assert!(ok.pass);
    assert_eq!(ok.error, "");

    let failed = connect_check(&fleet, &ep("10.0.0.2")).await;
    assert!(!failed.pass);
    assert_eq!(failed.error, "timed out");
}

#[tokio::test]
async fn connect_check_fails_when_disconnect_fails() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), MockDevice::new().failing_disconnect("broken pipe"));
    let result = connect_check(&fleet, &ep("10.0.0.1")).await;
    assert!(!result.pass);
    assert_eq!(result.error, "broken pipe");
}

#[tokio::test]
async fn users_check_samples_first_five() {
    let users: Vec<_> = (1..=7).map(|uid| user(uid, &format!("U{uid}"), &format!("Pegawai {uid}"))).collect();
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), MockDevice::new().with_users(users.clone()));

    let outcome = users_check(&fleet, &ep("10.0.0.1")).await;
    assert!(outcome.result.pass);
    let info = outcome.result.info.unwrap();
    assert_eq!(info.count, 7);
    assert_eq!(info.sample.len(), 5);
    assert_eq!(info.sample[0], (1, "U1".to_string(), "Pegawai 1".to_string()));
    assert_eq!(outcome.users, users);
}

#[tokio::test]
async fn users_check_failure_still_releases_session() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), MockDevice::new().failing_users("unpack requires a buffer"));

    let outcome = users_check(&fleet, &ep("10.0.0.1")).await;
    assert!(!outcome.result.pass);
    assert!(outcome.result.info.is_none());
    assert_eq!(outcome.result.error, "unpack requires a buffer");
    assert_eq!(fleet.stats().disconnects, 1);
}

#[tokio::test]
async fn attendance_check_keeps_raw_order_and_sorted_summary() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), healthy_device());

    let outcome = attendance_check(&fleet, &ep("10.0.0.1")).await;
    assert!(outcome.result.pass);

    let raw: Vec<_> = outcome.records.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(raw, vec!["A1", "7", "1001"]);

    let info = outcome.result.info.unwrap();
    assert_eq!(info.summary.count, 3);
    assert_eq!(info.summary.first.as_deref(), Some("2024-05-01 08:00:00"));
    assert_eq!(info.summary.last.as_deref(), Some("2024-05-01 17:00:00"));
    assert_eq!(info.summary.unique_users, 3);
    let tail: Vec<_> = info.tail.iter().map(|t| t.0.as_str()).collect();
    assert_eq!(tail, vec!["7", "A1", "1001"]);
}

#[tokio::test]
async fn negative_check_inverts_connect() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), MockDevice::new());

    let unreachable = negative_check(&fleet, &ep("10.0.0.250")).await;
    assert!(unreachable.pass);
    assert_eq!(unreachable.error, "");
    assert_eq!(unreachable.endpoint, "10.0.0.250:4370");

    let reachable = negative_check(&fleet, &ep("10.0.0.1")).await;
    assert!(!reachable.pass);
    assert_eq!(reachable.error, NEGATIVE_CONNECTED);
}

#[tokio::test]
async fn parallel_reports_every_endpoint_and_lists_failures() {
    let fleet = MockFleet::new()
        .with_device(&ep("10.0.0.1"), healthy_device())
        .with_device(&ep("10.0.0.2"), MockDevice::new().failing_attendance("TCP packet invalid"))
        .with_device(&ep("10.0.0.3"), MockDevice::new());
    let endpoints = vec![ep("10.0.0.1"), ep("10.0.0.2"), ep("10.0.0.3"), ep("10.0.0.4")];

    let result = run_parallel(shared(&fleet), &endpoints).await.unwrap();
    assert!(!result.pass);
    assert_eq!(result.error, "parallel error on: 10.0.0.2:4370, 10.0.0.4:4370");

    let devices = result.info.unwrap().devices;
    assert_eq!(devices.len(), 4);
    assert!(matches!(devices["10.0.0.1:4370"], ParallelEntry::Pulled { records: 3, .. }));
    assert!(matches!(devices["10.0.0.3:4370"], ParallelEntry::Pulled { records: 0, .. }));
    assert_eq!(
        devices["10.0.0.2:4370"],
        ParallelEntry::Failed { error: "TCP packet invalid".into() }
    );
}

#[tokio::test]
async fn parallel_runs_devices_concurrently() {
    let slow = || healthy_device().with_latency(Duration::from_millis(100));
    let fleet = MockFleet::new()
        .with_device(&ep("10.0.0.1"), slow())
        .with_device(&ep("10.0.0.2"), slow())
        .with_device(&ep("10.0.0.3"), slow());
    let endpoints = vec![ep("10.0.0.1"), ep("10.0.0.2"), ep("10.0.0.3")];

    let result = run_parallel(shared(&fleet), &endpoints).await.unwrap();
    assert!(result.pass);
    assert_eq!(result.error, "");

    let stats = fleet.stats();
    assert_eq!(stats.peak_in_flight, 3);
    assert_eq!(stats.total_sessions(), 3);
    for entry in result.info.unwrap().devices.values() {
        match entry {
            ParallelEntry::Pulled { duration_sec, records } => {
                assert_eq!(*records, 3);
                assert!(*duration_sec >= 0.2);
            }
            ParallelEntry::Failed { error } => panic!("unexpected failure: {error}"),
        }
    }
}

#[tokio::test]
async fn parallel_skipped_below_two_endpoints() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), healthy_device());
    assert!(run_parallel(shared(&fleet), &[ep("10.0.0.1")]).await.is_none());
    assert_eq!(fleet.stats().total_sessions(), 0);
}

#[tokio::test]
async fn full_run_records_device_failures_without_failing() {
    let fleet = MockFleet::new()
        .with_device(&ep("10.0.0.1"), healthy_device())
        .with_device(&ep("10.0.0.2"), MockDevice::new().failing_users("timed out"));
    let csv_dir = tempfile::tempdir().unwrap();
    let report_path = csv_dir.path().join("report.json");

    let options = RunOptions {
        ips: "10.0.0.1,10.0.0.2,10.0.0.3".into(),
        save_csv: true,
        csv_dir: csv_dir.path().join("csv"),
        report_path: Some(report_path.clone()),
        ..RunOptions::default()
    };
    let outcome = run_deepcheck(shared(&fleet), &options).await.unwrap();
    assert_eq!(outcome.exit_code, EXIT_OK);

    let report = &outcome.report;
    assert_eq!(report.endpoints, vec!["10.0.0.1:4370", "10.0.0.2:4370", "10.0.0.3:4370"]);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results.keys().collect::<Vec<_>>(), report.endpoints);
    assert!(report.parallel.is_none());
    assert!(report.negative.is_none());

    let healthy = &report.results["10.0.0.1:4370"];
    assert!(healthy.connect.pass && healthy.users.pass && healthy.attendance.pass);
    let fallback = healthy.fallback.as_ref().unwrap().info.as_ref().unwrap();
    assert_eq!(fallback.fallback_count, 1);
    assert_eq!(fallback.samples, vec![("7".to_string(), Some("2024-05-01 08:00:00".to_string()))]);
    assert!(healthy.csv.ends_with(".csv"));
    let csv = std::fs::read_to_string(&healthy.csv).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.lines().nth(1).unwrap().starts_with("A1,2024-05-01 09:00:00"));

    let no_users = &report.results["10.0.0.2:4370"];
    assert!(no_users.connect.pass);
    assert!(!no_users.users.pass);
    assert!(no_users.attendance.pass);
    assert!(no_users.fallback.is_none());
    assert_eq!(no_users.csv, "", "no records, no CSV");

    let offline = &report.results["10.0.0.3:4370"];
    assert!(!offline.connect.pass);
    assert_eq!(offline.connect.error, "can't reach device (ping 10.0.0.3)");

    // one fresh session per primitive, per device
    let stats = fleet.stats();
    assert_eq!(stats.sessions_for("10.0.0.1:4370"), 3);
    assert_eq!(stats.sessions_for("10.0.0.3:4370"), 3);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["results"]["10.0.0.2:4370"]["users"]["error"], "timed out");
    assert_eq!(json["results"]["10.0.0.1:4370"]["fallback"]["info"]["fallback_count"], 1);
}

#[tokio::test]
async fn failing_parallel_phase_sets_exit_code() {
    let fleet = MockFleet::new()
        .with_device(&ep("10.0.0.1"), healthy_device())
        .with_device(&ep("10.0.0.2"), MockDevice::new().failing_attendance("TCP packet invalid"));
    let options = RunOptions {
        ips: "10.0.0.1,10.0.0.2".into(),
        parallel: true,
        ..RunOptions::default()
    };

    let outcome = run_deepcheck(shared(&fleet), &options).await.unwrap();
    assert_eq!(outcome.exit_code, EXIT_CHECK_FAILED);
    let parallel = outcome.report.parallel.unwrap();
    assert!(!parallel.pass);
    assert_eq!(parallel.error, "parallel error on: 10.0.0.2:4370");
}

#[tokio::test]
async fn parallel_flag_ignored_for_single_endpoint() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), healthy_device());
    let options = RunOptions {
        ips: "10.0.0.1".into(),
        parallel: true,
        ..RunOptions::default()
    };

    let outcome = run_deepcheck(shared(&fleet), &options).await.unwrap();
    assert_eq!(outcome.exit_code, EXIT_OK);
    assert!(outcome.report.parallel.is_none());
}

#[tokio::test]
async fn negative_phase_drives_exit_code() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), healthy_device());

    let unreachable = RunOptions {
        ips: "10.0.0.1".into(),
        bad_endpoint: Some("10.0.0.250:5005".into()),
        ..RunOptions::default()
    };
    let outcome = run_deepcheck(shared(&fleet), &unreachable).await.unwrap();
    assert_eq!(outcome.exit_code, EXIT_OK);
    let negative = outcome.report.negative.unwrap();
    assert!(negative.pass);
    assert_eq!(negative.endpoint, "10.0.0.250:5005");

    let reachable = RunOptions {
        bad_endpoint: Some("10.0.0.1".into()),
        ..unreachable
    };
    let outcome = run_deepcheck(shared(&fleet), &reachable).await.unwrap();
    assert_eq!(outcome.exit_code, EXIT_CHECK_FAILED);
    assert_eq!(outcome.report.negative.unwrap().error, NEGATIVE_CONNECTED);
}

#[tokio::test]
async fn configuration_errors_abort_before_any_device_call() {
    let fleet = MockFleet::new().with_device(&ep("10.0.0.1"), healthy_device());

    let missing = RunOptions::default();
    assert_eq!(run_deepcheck(shared(&fleet), &missing).await.unwrap_err(), ConfigError::NoHosts);

    let mismatch = RunOptions {
        ips: "10.0.0.1,10.0.0.2,10.0.0.3".into(),
        ports: "4370,4371".into(),
        ..RunOptions::default()
    };
    assert_eq!(
        run_deepcheck(shared(&fleet), &mismatch).await.unwrap_err(),
        ConfigError::PortCountMismatch { ports: 2, hosts: 3 }
    );

    let bad_negative = RunOptions {
        ips: "10.0.0.1".into(),
        bad_endpoint: Some("10.0.0.250:nope".into()),
        ..RunOptions::default()
    };
    assert_eq!(
        run_deepcheck(shared(&fleet), &bad_negative).await.unwrap_err(),
        ConfigError::InvalidPort("nope".into())
    );

    assert_eq!(fleet.stats().total_sessions(), 0);
}

#[tokio::test]
async fn report_results_keep_resolution_order() {
    let fleet = MockFleet::new()
        .with_device(&ep("10.0.0.2"), healthy_device())
        .with_device(&ep("10.0.0.10"), healthy_device());
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let options = RunOptions {
        ips: "10.0.0.2,10.0.0.10".into(),
        report_path: Some(report_path.clone()),
        ..RunOptions::default()
    };

    let outcome = run_deepcheck(shared(&fleet), &options).await.unwrap();
    assert_eq!(outcome.report.endpoints, vec!["10.0.0.2:4370", "10.0.0.10:4370"]);

    let text = std::fs::read_to_string(&report_path).unwrap();
    let second = text.find("\"10.0.0.2:4370\": {").unwrap();
    let tenth = text.find("\"10.0.0.10:4370\": {").unwrap();
    assert!(second < tenth, "results should be written in check order");
}
