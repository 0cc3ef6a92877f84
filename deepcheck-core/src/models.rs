use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One device to test. Displayed and keyed as `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Directory entry as listed by the device. `uid` is the device-internal
/// handle, `user_id` the identifier people actually use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: u32,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub uid: u32,
    pub user_id: String,
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub punch: i32,
}

/// `2024-05-01 08:00:00`, or `2024-05-01 08:00:00.250000` when the
/// microsecond part is nonzero.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() / 1_000 == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

pub fn iso(ts: Option<&NaiveDateTime>) -> Option<String> {
    ts.map(format_timestamp)
}
