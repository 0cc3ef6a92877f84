//! Run report and file outputs
//!
//! - `Report` is built up phase by phase and written once as pretty JSON
//! - one attendance CSV per device, named after host, port and run time

use chrono::NaiveDateTime;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Index;
use std::path::{Path, PathBuf};

use crate::checks::{AttendanceInfo, CheckResult, NegativeResult, UsersInfo};
use crate::error::ReportError;
use crate::fallback::FallbackInfo;
use crate::models::{format_timestamp, iso, AttendanceRecord, Endpoint};
use crate::parallel::ParallelResult;

pub const CSV_HEADER: [&str; 5] = ["user_id", "timestamp", "status", "punch", "uid"];

/// Everything the sequential phase learned about one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRunRecord {
    pub connect: CheckResult<()>,
    pub users: CheckResult<UsersInfo>,
    pub attendance: CheckResult<AttendanceInfo>,
    /// Only present when both users and attendance were listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<CheckResult<FallbackInfo>>,
    /// Path of the CSV written for this device, empty if none.
    pub csv: String,
}

/// Device records keyed by `host:port`, kept in the order the endpoints were
/// checked. A repeated key replaces the record but keeps its first position.
#[derive(Debug, Clone, Default)]
pub struct DeviceResults {
    entries: Vec<(String, DeviceRunRecord)>,
}

impl DeviceResults {
    pub fn insert(&mut self, key: String, record: DeviceRunRecord) {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(i) => self.entries[i].1 = record,
            None => self.entries.push((key, record)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&DeviceRunRecord> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Index<&str> for DeviceResults {
    type Output = DeviceRunRecord;

    fn index(&self, key: &str) -> &DeviceRunRecord {
        self.get(key).unwrap_or_else(|| panic!("no results for {key}"))
    }
}

impl Serialize for DeviceResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, record) in &self.entries {
            map.serialize_entry(key, record)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub started_at: String,
    pub endpoints: Vec<String>,
    pub env: BTreeMap<String, Option<String>>,
    pub results: DeviceResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<ParallelResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<NegativeResult>,
}

impl Report {
    pub fn new(started_at: &NaiveDateTime, endpoints: &[Endpoint], env: BTreeMap<String, Option<String>>) -> Self {
        Self {
            started_at: format_timestamp(started_at),
            endpoints: endpoints.iter().map(Endpoint::key).collect(),
            env,
            results: DeviceResults::default(),
            parallel: None,
            negative: None,
        }
    }

    pub fn record_device(&mut self, endpoint: &Endpoint, record: DeviceRunRecord) {
        self.results.insert(endpoint.key(), record);
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let io_err = |source| ReportError::Io { path: path.to_path_buf(), source };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(io_err)
    }
}

/// `attendance_10-0-0-1_4370_20240501-080000.csv`
pub fn csv_file_name(endpoint: &Endpoint, run_at: &NaiveDateTime) -> String {
    format!(
        "attendance_{}_{}_{}.csv",
        endpoint.host.replace('.', "-"),
        endpoint.port,
        run_at.format("%Y%m%d-%H%M%S")
    )
}

/// Write one row per record, device order. Returns `None` without touching
/// the filesystem when there is nothing to write.
pub fn write_attendance_csv(
    dir: &Path,
    endpoint: &Endpoint,
    records: &[AttendanceRecord],
    run_at: &NaiveDateTime,
) -> Result<Option<PathBuf>, ReportError> {
    if records.is_empty() {
        return Ok(None);
    }
    fs::create_dir_all(dir).map_err(|source| ReportError::Io { path: dir.to_path_buf(), source })?;

    let path = dir.join(csv_file_name(endpoint, run_at));
    let io_err = |source| ReportError::Io { path: path.clone(), source };

    let mut writer = BufWriter::new(File::create(&path).map_err(io_err)?);
    write_row(&mut writer, CSV_HEADER.iter().map(|h| Cow::Borrowed(*h))).map_err(io_err)?;
    for r in records {
        let timestamp = iso(r.timestamp.as_ref()).unwrap_or_default();
        let row = [
            Cow::Borrowed(r.user_id.as_str()),
            Cow::Owned(timestamp),
            Cow::Owned(r.status.to_string()),
            Cow::Owned(r.punch.to_string()),
            Cow::Owned(r.uid.to_string()),
        ];
        write_row(&mut writer, row.into_iter()).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(Some(path))
}

fn write_row<'a, W: Write>(out: &mut W, fields: impl Iterator<Item = Cow<'a, str>>) -> std::io::Result<()> {
    let line: Vec<String> = fields.map(|f| csv_field(&f).into_owned()).collect();
    out.write_all(line.join(",").as_bytes())?;
    out.write_all(b"\r\n")
}

/// Quote a field only when it contains a separator, quote or line break.
fn csv_field(raw: &str) -> Cow<'_, str> {
    if raw.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", raw.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(raw)
    }
}
