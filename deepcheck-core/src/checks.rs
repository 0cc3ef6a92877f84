//! Test primitives
//!
//! Each primitive opens its own session and folds any device failure into a
//! `CheckResult` with `pass = false`. Nothing is propagated past this module.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::device::{self, Connector};
use crate::error::DeviceError;
use crate::models::{iso, AttendanceRecord, Endpoint, User};

pub const USERS_SAMPLE_LEN: usize = 5;
pub const ATTENDANCE_TAIL_LEN: usize = 3;
pub const NEGATIVE_CONNECTED: &str = "unexpectedly connected to bad endpoint";

/// Outcome of one check. `info` is absent on failure; `error` is empty on pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult<I> {
    pub pass: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<I>,
    pub error: String,
}

impl<I> CheckResult<I> {
    pub fn passed(info: Option<I>) -> Self {
        Self { pass: true, info, error: String::new() }
    }

    pub fn failed(error: &DeviceError) -> Self {
        Self { pass: false, info: None, error: error.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsersInfo {
    pub count: usize,
    /// (uid, user_id, name), listing order.
    pub sample: Vec<(u32, String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub count: usize,
    pub first: Option<String>,
    pub last: Option<String>,
    pub unique_users: usize,
}

/// (user_id, timestamp, (status, punch), uid)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TailEntry(pub String, pub Option<String>, pub (i32, i32), pub u32);

impl From<&AttendanceRecord> for TailEntry {
    fn from(r: &AttendanceRecord) -> Self {
        TailEntry(r.user_id.clone(), iso(r.timestamp.as_ref()), (r.status, r.punch), r.uid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceInfo {
    pub summary: AttendanceSummary,
    pub tail: Vec<TailEntry>,
}

pub struct UsersOutcome {
    pub result: CheckResult<UsersInfo>,
    pub users: Vec<User>,
}

pub struct AttendanceOutcome {
    pub result: CheckResult<AttendanceInfo>,
    /// Raw records in device order, for CSV output and fallback detection.
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativeResult {
    pub pass: bool,
    pub endpoint: String,
    pub error: String,
}

pub async fn connect_check(connector: &dyn Connector, endpoint: &Endpoint) -> CheckResult<()> {
    match device::probe(connector, endpoint).await {
        Ok(()) => CheckResult::passed(None),
        Err(e) => {
            warn!("connect to {} failed: {}", endpoint, e);
            CheckResult::failed(&e)
        }
    }
}

pub async fn users_check(connector: &dyn Connector, endpoint: &Endpoint) -> UsersOutcome {
    match device::fetch_users(connector, endpoint).await {
        Ok(users) => {
            debug!("{} listed {} users", endpoint, users.len());
            let info = UsersInfo {
                count: users.len(),
                sample: users
                    .iter()
                    .take(USERS_SAMPLE_LEN)
                    .map(|u| (u.uid, u.user_id.clone(), u.name.clone()))
                    .collect(),
            };
            UsersOutcome { result: CheckResult::passed(Some(info)), users }
        }
        Err(e) => {
            warn!("get_users on {} failed: {}", endpoint, e);
            UsersOutcome { result: CheckResult::failed(&e), users: Vec::new() }
        }
    }
}

pub async fn attendance_check(connector: &dyn Connector, endpoint: &Endpoint) -> AttendanceOutcome {
    match device::fetch_attendance(connector, endpoint).await {
        Ok(records) => {
            debug!("{} returned {} attendance records", endpoint, records.len());
            let info = attendance_info(&records);
            AttendanceOutcome { result: CheckResult::passed(Some(info)), records }
        }
        Err(e) => {
            warn!("get_attendance on {} failed: {}", endpoint, e);
            AttendanceOutcome { result: CheckResult::failed(&e), records: Vec::new() }
        }
    }
}

/// Passes iff connecting to `endpoint` fails.
pub async fn negative_check(connector: &dyn Connector, endpoint: &Endpoint) -> NegativeResult {
    let connect = connect_check(connector, endpoint).await;
    NegativeResult {
        pass: !connect.pass,
        endpoint: endpoint.key(),
        error: if connect.pass { NEGATIVE_CONNECTED.to_string() } else { String::new() },
    }
}

/// Records sorted by timestamp, ties kept in listing order.
pub fn sorted_by_timestamp(records: &[AttendanceRecord]) -> Vec<&AttendanceRecord> {
    let mut sorted: Vec<&AttendanceRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);
    sorted
}

/// `first`/`last` span the records that carry a timestamp; null ones are skipped.
pub fn summarize_attendance(records: &[AttendanceRecord]) -> AttendanceSummary {
    let stamped = || records.iter().filter_map(|r| r.timestamp);
    let unique_users = records.iter().map(|r| r.user_id.as_str()).collect::<HashSet<_>>().len();
    AttendanceSummary {
        count: records.len(),
        first: iso(stamped().min().as_ref()),
        last: iso(stamped().max().as_ref()),
        unique_users,
    }
}

pub fn attendance_info(records: &[AttendanceRecord]) -> AttendanceInfo {
    let sorted = sorted_by_timestamp(records);
    let skip = sorted.len().saturating_sub(ATTENDANCE_TAIL_LEN);
    AttendanceInfo {
        summary: summarize_attendance(records),
        tail: sorted[skip..].iter().map(|r| TailEntry::from(*r)).collect(),
    }
}
