//! Fallback user_id detection
//!
//! Some firmwares emit attendance records whose user_id was never resolved and
//! substitute the numeric uid instead. A record is flagged when:
//!   - its user_id is NOT in the user directory, AND
//!   - its user_id == uid rendered in decimal
//!
//! This is advisory only. The match is coincidental by nature: a device that
//! hands out small sequential numeric user_ids can be flagged even though
//! nothing was substituted. The check always passes and just reports counts.

use serde::Serialize;
use std::collections::HashMap;

use crate::checks::CheckResult;
use crate::models::{iso, AttendanceRecord, User};

pub const FALLBACK_SAMPLE_LEN: usize = 5;

/// user_id -> uid
pub type UserDirectory = HashMap<String, u32>;

/// First occurrence wins on duplicate user_id.
pub fn build_directory(users: &[User]) -> UserDirectory {
    let mut directory = UserDirectory::with_capacity(users.len());
    for user in users {
        directory.entry(user.user_id.clone()).or_insert(user.uid);
    }
    directory
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackInfo {
    pub fallback_count: usize,
    /// (user_id, timestamp), record order.
    pub samples: Vec<(String, Option<String>)>,
}

pub fn is_fallback(directory: &UserDirectory, record: &AttendanceRecord) -> bool {
    !directory.contains_key(&record.user_id) && record.user_id == record.uid.to_string()
}

pub fn classify(directory: &UserDirectory, records: &[AttendanceRecord]) -> FallbackInfo {
    let flagged: Vec<&AttendanceRecord> = records.iter().filter(|r| is_fallback(directory, r)).collect();
    FallbackInfo {
        fallback_count: flagged.len(),
        samples: flagged
            .iter()
            .take(FALLBACK_SAMPLE_LEN)
            .map(|r| (r.user_id.clone(), iso(r.timestamp.as_ref())))
            .collect(),
    }
}

pub fn fallback_check(directory: &UserDirectory, records: &[AttendanceRecord]) -> CheckResult<FallbackInfo> {
    CheckResult::passed(Some(classify(directory, records)))
}
