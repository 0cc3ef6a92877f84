//! Device client seam
//!
//! The wire protocol lives outside this crate. The harness only needs a way to
//! open a fresh session per endpoint and the four operations below; any
//! failure is a `DeviceError` carrying a message.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::DeviceError;
use crate::models::{AttendanceRecord, Endpoint, User};

#[async_trait]
pub trait DeviceSession: Send {
    async fn connect(&mut self) -> Result<(), DeviceError>;
    async fn disconnect(&mut self) -> Result<(), DeviceError>;
    async fn get_users(&mut self) -> Result<Vec<User>, DeviceError>;
    async fn get_attendance(&mut self) -> Result<Vec<AttendanceRecord>, DeviceError>;
}

/// Opens independent sessions. Sessions are never pooled or reused.
pub trait Connector: Send + Sync {
    fn open(&self, endpoint: &Endpoint) -> Box<dyn DeviceSession>;
}

pub type SharedConnector = Arc<dyn Connector>;

/// connect -> disconnect
pub async fn probe(connector: &dyn Connector, endpoint: &Endpoint) -> Result<(), DeviceError> {
    let mut session = connector.open(endpoint);
    session.connect().await?;
    session.disconnect().await
}

/// connect -> get_users -> disconnect
pub async fn fetch_users(connector: &dyn Connector, endpoint: &Endpoint) -> Result<Vec<User>, DeviceError> {
    let mut session = connector.open(endpoint);
    session.connect().await?;
    let users = session.get_users().await;
    close(&mut session, endpoint, users).await
}

/// connect -> get_attendance -> disconnect
pub async fn fetch_attendance(
    connector: &dyn Connector,
    endpoint: &Endpoint,
) -> Result<Vec<AttendanceRecord>, DeviceError> {
    let mut session = connector.open(endpoint);
    session.connect().await?;
    let records = session.get_attendance().await;
    close(&mut session, endpoint, records).await
}

/// Disconnect after an operation. When the operation itself failed the
/// session is still released, but the operation's error is the one reported.
async fn close<T>(
    session: &mut Box<dyn DeviceSession>,
    endpoint: &Endpoint,
    outcome: Result<T, DeviceError>,
) -> Result<T, DeviceError> {
    match outcome {
        Ok(value) => {
            session.disconnect().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(de) = session.disconnect().await {
                debug!("disconnect from {} after failure also failed: {}", endpoint, de);
            }
            Err(e)
        }
    }
}
