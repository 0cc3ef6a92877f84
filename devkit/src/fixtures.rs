/*!
Fleet fixtures and record builders

A fixture is a YAML file describing simulated devices keyed by `host:port`:

```yaml
devices:
  "10.0.0.1:4370":
    users:
      - { uid: 1, user_id: "1001", name: "Ayu" }
    attendance:
      - { uid: 1, user_id: "1001", timestamp: "2024-05-01T08:00:00", status: 1, punch: 0 }
  "10.0.0.2:4370":
    fail_attendance: "TCP packet invalid"
    latency_ms: 150
```
*/

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use deepcheck_core::{AttendanceRecord, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::mock_device::{MockDevice, MockFleet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetFixture {
    #[serde(default)]
    pub devices: BTreeMap<String, MockDevice>,
}

impl FleetFixture {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("invalid fleet fixture")
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read fleet fixture {}", path.display()))?;
        let fixture = Self::from_yaml(&text)?;
        tracing::info!("loaded {} simulated device(s) from {}", fixture.devices.len(), path.display());
        Ok(fixture)
    }

    pub fn into_fleet(self) -> MockFleet {
        let mut fleet = MockFleet::new();
        for (key, device) in self.devices {
            fleet.insert(key, device);
        }
        fleet
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS`. Panics on malformed input; meant for test data.
pub fn ts(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|e| panic!("bad timestamp '{text}': {e}"))
}

pub fn user(uid: u32, user_id: &str, name: &str) -> User {
    User {
        uid,
        user_id: user_id.to_string(),
        name: name.to_string(),
    }
}

/// Check-in record (status 1, punch 0) at `timestamp`.
pub fn record(uid: u32, user_id: &str, timestamp: &str) -> AttendanceRecord {
    AttendanceRecord {
        uid,
        user_id: user_id.to_string(),
        timestamp: Some(ts(timestamp)),
        status: 1,
        punch: 0,
    }
}
