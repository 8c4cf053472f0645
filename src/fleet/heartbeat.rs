//! Heartbeat freshness (`spec.md` §4.H).

use crate::core::atomic_store::{read_typed, write_json};
use crate::core::error::Result;
use crate::core::model::{Heartbeat, LoopState};
use crate::core::path_resolver::heartbeat_path;
use crate::core::time::{age_seconds, now_rfc3339};
use std::path::Path;

pub const DEFAULT_HEARTBEAT_TTL_SECONDS: u64 = 90;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: u64 = 30;

/// Write a project agent's heartbeat, stamping `updated_at` to now.
pub fn record(project_root: &Path, mut heartbeat: Heartbeat) -> Result<Heartbeat> {
    heartbeat.updated_at = now_rfc3339();
    write_json(&heartbeat_path(project_root), &heartbeat)?;
    Ok(heartbeat)
}

pub fn load(project_root: &Path) -> Result<Heartbeat> {
    read_typed(&heartbeat_path(project_root))
}

/// `true` iff the heartbeat's `updated_at` is within `ttl_seconds` of now.
/// A heartbeat with no timestamp at all (never written) is never fresh.
pub fn is_fresh(heartbeat: &Heartbeat, ttl_seconds: u64) -> bool {
    match age_seconds(&heartbeat.updated_at) {
        Some(age) => age <= ttl_seconds as i64,
        None => false,
    }
}

/// Node status shown by the control plane when a heartbeat has gone
/// stale: idle loop state, a human-readable explanation (`spec.md` §4.I).
pub fn stale_fallback_summary(heartbeat: &Heartbeat) -> (LoopState, String) {
    let age = age_seconds(&heartbeat.updated_at).unwrap_or(i64::MAX);
    let summary = if age == i64::MAX {
        "Agent reporting stale; no heartbeat recorded".to_string()
    } else {
        format!("Agent reporting stale; last heartbeat {age}s ago")
    };
    (LoopState::Idle, summary)
}
