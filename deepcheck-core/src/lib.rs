/*!
# Deepcheck Core - Orchestration engine for attendance terminal checks

Runs a fixed battery of checks against each configured device endpoint:
- Endpoint resolution from `host[:port]` lists and port lists
- Connect / users / attendance primitives, one fresh session each
- Fallback user_id detection (advisory heuristic)
- Parallel attendance pull across all devices
- Negative check against a known-bad endpoint
- CSV per device and a JSON report for the whole run
*/

pub mod checks;
pub mod device;
pub mod endpoints;
pub mod error;
pub mod fallback;
pub mod models;
pub mod orchestrator;
pub mod parallel;
pub mod report;
pub mod state;

pub use device::{Connector, DeviceSession, SharedConnector};
pub use endpoints::{parse_endpoint, resolve_endpoints, DEFAULT_PORT};
pub use error::{ConfigError, DeviceError, ReportError};
pub use models::{AttendanceRecord, Endpoint, User};
pub use orchestrator::{run_deepcheck, RunOptions, RunOutcome};
pub use report::Report;
