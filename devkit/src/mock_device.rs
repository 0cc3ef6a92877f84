/*!
Mock device client

Simulates attendance terminals in memory. Every `open` produces an
independent session, and the fleet counts sessions and concurrent calls so
tests can assert the harness never shares or reuses a session.
*/

use async_trait::async_trait;
use deepcheck_core::device::{Connector, DeviceSession};
use deepcheck_core::state::{new_state, Shared};
use deepcheck_core::{AttendanceRecord, DeviceError, Endpoint, User};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Scripted behaviour of one device. Any `fail_*` message makes that
/// operation fail with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MockDevice {
    pub users: Vec<User>,
    pub attendance: Vec<AttendanceRecord>,
    pub fail_connect: Option<String>,
    pub fail_disconnect: Option<String>,
    pub fail_users: Option<String>,
    pub fail_attendance: Option<String>,
    /// Delay applied to every operation, in milliseconds.
    pub latency_ms: u64,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(mut self, users: Vec<User>) -> Self {
        self.users = users;
        self
    }

    pub fn with_attendance(mut self, attendance: Vec<AttendanceRecord>) -> Self {
        self.attendance = attendance;
        self
    }

    pub fn failing_connect(mut self, message: &str) -> Self {
        self.fail_connect = Some(message.to_string());
        self
    }

    pub fn failing_disconnect(mut self, message: &str) -> Self {
        self.fail_disconnect = Some(message.to_string());
        self
    }

    pub fn failing_users(mut self, message: &str) -> Self {
        self.fail_users = Some(message.to_string());
        self
    }

    pub fn failing_attendance(mut self, message: &str) -> Self {
        self.fail_attendance = Some(message.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = latency.as_millis() as u64;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetStats {
    /// Sessions opened per `host:port`.
    pub sessions: HashMap<String, usize>,
    pub connects: usize,
    pub disconnects: usize,
    /// Operations currently sleeping/running.
    pub in_flight: usize,
    /// Highest `in_flight` ever observed.
    pub peak_in_flight: usize,
}

impl FleetStats {
    pub fn sessions_for(&self, key: &str) -> usize {
        self.sessions.get(key).copied().unwrap_or(0)
    }

    pub fn total_sessions(&self) -> usize {
        self.sessions.values().sum()
    }
}

/// Devices keyed by `host:port`. Unknown endpoints behave like an
/// unreachable host.
#[derive(Clone, Default)]
pub struct MockFleet {
    devices: HashMap<String, MockDevice>,
    stats: Shared<FleetStats>,
}

impl MockFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, endpoint: &Endpoint, device: MockDevice) -> Self {
        self.insert(endpoint.key(), device);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, device: MockDevice) {
        self.devices.insert(key.into(), device);
    }

    pub fn stats(&self) -> FleetStats {
        self.stats.lock().clone()
    }
}

impl Connector for MockFleet {
    fn open(&self, endpoint: &Endpoint) -> Box<dyn DeviceSession> {
        let key = endpoint.key();
        *self.stats.lock().sessions.entry(key.clone()).or_insert(0) += 1;

        let device = self.devices.get(&key).cloned().unwrap_or_else(|| {
            MockDevice::new().failing_connect(&format!("can't reach device (ping {})", endpoint.host))
        });
        Box::new(MockSession {
            key,
            device,
            connected: false,
            stats: self.stats.clone(),
        })
    }
}

struct MockSession {
    key: String,
    device: MockDevice,
    connected: bool,
    stats: Shared<FleetStats>,
}

impl MockSession {
    /// Simulated round trip: latency, then the scripted failure if any.
    async fn round_trip(&self, failure: &Option<String>) -> Result<(), DeviceError> {
        {
            let mut stats = self.stats.lock();
            stats.in_flight += 1;
            stats.peak_in_flight = stats.peak_in_flight.max(stats.in_flight);
        }
        if self.device.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.device.latency_ms)).await;
        }
        self.stats.lock().in_flight -= 1;

        match failure {
            Some(message) => Err(DeviceError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn ensure_connected(&self) -> Result<(), DeviceError> {
        if self.connected {
            Ok(())
        } else {
            Err(DeviceError::new(format!("instance are not connected ({})", self.key)))
        }
    }
}

#[async_trait]
impl DeviceSession for MockSession {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        self.round_trip(&self.device.fail_connect).await?;
        self.connected = true;
        self.stats.lock().connects += 1;
        tracing::debug!("[mock] connected to {}", self.key);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.connected = false;
        self.stats.lock().disconnects += 1;
        self.round_trip(&self.device.fail_disconnect).await
    }

    async fn get_users(&mut self) -> Result<Vec<User>, DeviceError> {
        self.ensure_connected()?;
        self.round_trip(&self.device.fail_users).await?;
        Ok(self.device.users.clone())
    }

    async fn get_attendance(&mut self) -> Result<Vec<AttendanceRecord>, DeviceError> {
        self.ensure_connected()?;
        self.round_trip(&self.device.fail_attendance).await?;
        Ok(self.device.attendance.clone())
    }
}
