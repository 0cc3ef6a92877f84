/*!
# Deepcheck DevKit - In-memory devices for tests and dry runs

Lets the harness run end to end without terminals on the network:
- Scripted mock devices (users, attendance, injected failures, latency)
- A mock fleet implementing `Connector`, with session accounting
- YAML fleet fixtures for the CLI's simulated backend
- Builders for users and attendance records
*/

pub mod fixtures;
pub mod mock_device;

pub use fixtures::{record, ts, user, FleetFixture};
pub use mock_device::{FleetStats, MockDevice, MockFleet};
