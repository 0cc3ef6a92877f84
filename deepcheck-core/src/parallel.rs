//! Parallel attendance pull
//!
//! One tokio task per endpoint, no pooling. Each task writes exactly one entry
//! into the shared map; the lock is only held for that insert. The phase waits
//! for every task, there is no timeout: a hung device hangs the phase.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

use crate::checks::CheckResult;
use crate::device::{self, SharedConnector};
use crate::models::Endpoint;
use crate::state::{new_state, take_state, Shared};

pub const MIN_PARALLEL_ENDPOINTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParallelEntry {
    Pulled { duration_sec: f64, records: usize },
    Failed { error: String },
}

impl ParallelEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, ParallelEntry::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelInfo {
    pub devices: BTreeMap<String, ParallelEntry>,
}

pub type ParallelResult = CheckResult<ParallelInfo>;

/// Pull attendance from every endpoint at once. Returns `None` when fewer than
/// two endpoints are given (phase skipped).
pub async fn run_parallel(connector: SharedConnector, endpoints: &[Endpoint]) -> Option<ParallelResult> {
    if endpoints.len() < MIN_PARALLEL_ENDPOINTS {
        return None;
    }
    info!("parallel pull across {} endpoints", endpoints.len());

    let devices: Shared<BTreeMap<String, ParallelEntry>> = new_state(BTreeMap::new());

    let workers = endpoints.iter().cloned().map(|endpoint| {
        let key = endpoint.key();
        let connector = connector.clone();
        let devices = devices.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let entry = match device::fetch_attendance(connector.as_ref(), &endpoint).await {
                Ok(records) => ParallelEntry::Pulled {
                    duration_sec: round2(started.elapsed().as_secs_f64()),
                    records: records.len(),
                },
                Err(e) => {
                    warn!("parallel pull from {} failed: {}", endpoint, e);
                    ParallelEntry::Failed { error: e.to_string() }
                }
            };
            devices.lock().insert(endpoint.key(), entry);
        });
        async move { (key, handle.await) }
    });

    for (key, joined) in join_all(workers).await {
        if let Err(e) = joined {
            warn!("parallel worker for {} did not finish: {}", key, e);
            devices.lock().insert(key, ParallelEntry::Failed { error: format!("worker failed: {e}") });
        }
    }

    let devices = take_state(&devices);
    let failing: Vec<&str> = devices
        .iter()
        .filter(|(_, entry)| entry.is_error())
        .map(|(key, _)| key.as_str())
        .collect();

    let pass = failing.is_empty();
    let error = if pass {
        String::new()
    } else {
        format!("parallel error on: {}", failing.join(", "))
    };

    Some(CheckResult {
        pass,
        info: Some(ParallelInfo { devices }),
        error,
    })
}

fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
