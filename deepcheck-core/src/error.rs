use std::path::PathBuf;

/// Bad endpoint/port specification. Always detected before any device is contacted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no device endpoint given (use --ips or ZK_IPS)")]
    NoHosts,
    #[error("empty host in endpoint '{0}'")]
    EmptyHost(String),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("port list has {ports} entries, expected 1 or {hosts} (one per host)")]
    PortCountMismatch { ports: usize, hosts: usize },
}

/// Failure surfaced by the device client. Only the message is meaningful to
/// the harness; no assumption is made about the client's own error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DeviceError {
    pub message: String,
}

impl DeviceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
