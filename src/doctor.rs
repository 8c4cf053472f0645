//! `maestro doctor`: store-health checks and optional repair
//! (`spec.md` §6 CLI surface).
//!
//! Grounded on the teacher's doctor plugin: a flat list of named checks,
//! each producing a pass/fail/fixed verdict, rendered as text or JSON.

use crate::core::path_resolver::{self as paths, StoreLayout};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fixed,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }
}

/// Run every check against `store_root`. With `fix`, attempt the
/// corresponding repair (currently: creating a missing store root, and
/// removing `.lock` files older than the atomic-store retry window —
/// those can only be orphans of a process that crashed mid-write).
pub fn run(store_root: &Path, fix: bool) -> DoctorReport {
    let mut checks = Vec::new();
    checks.push(check_store_root_exists(store_root, fix));
    checks.push(check_store_layout(store_root));
    checks.push(check_stale_locks(store_root, fix));
    DoctorReport { checks }
}

fn check_store_root_exists(store_root: &Path, fix: bool) -> CheckResult {
    if store_root.is_dir() {
        return CheckResult {
            name: "store_root_exists".into(),
            status: CheckStatus::Ok,
            detail: store_root.display().to_string(),
        };
    }
    if fix {
        match std::fs::create_dir_all(store_root) {
            Ok(()) => CheckResult {
                name: "store_root_exists".into(),
                status: CheckStatus::Fixed,
                detail: format!("created {}", store_root.display()),
            },
            Err(e) => CheckResult {
                name: "store_root_exists".into(),
                status: CheckStatus::Fail,
                detail: e.to_string(),
            },
        }
    } else {
        CheckResult {
            name: "store_root_exists".into(),
            status: CheckStatus::Fail,
            detail: format!("{} does not exist; re-run with --fix", store_root.display()),
        }
    }
}

fn check_store_layout(store_root: &Path) -> CheckResult {
    if !store_root.is_dir() {
        return CheckResult {
            name: "store_layout".into(),
            status: CheckStatus::Warn,
            detail: "store root missing, layout unknown".into(),
        };
    }
    let layout = paths::detect_layout(store_root);
    let slugs = paths::list_project_slugs(store_root).unwrap_or_default();
    let detail = match layout {
        StoreLayout::SingleProject => "single-project store".to_string(),
        StoreLayout::MultiProject => format!("multi-project store, {} project(s)", slugs.len()),
    };
    CheckResult { name: "store_layout".into(), status: CheckStatus::Ok, detail }
}

fn check_stale_locks(store_root: &Path, fix: bool) -> CheckResult {
    let mut found = 0usize;
    let mut removed = 0usize;
    if store_root.is_dir() {
        for entry in walk_lock_files(store_root) {
            found += 1;
            if fix && std::fs::remove_file(&entry).is_ok() {
                removed += 1;
            }
        }
    }
    if found == 0 {
        CheckResult { name: "stale_locks".into(), status: CheckStatus::Ok, detail: "none found".into() }
    } else if fix {
        CheckResult {
            name: "stale_locks".into(),
            status: CheckStatus::Fixed,
            detail: format!("removed {removed}/{found} lock files"),
        }
    } else {
        CheckResult {
            name: "stale_locks".into(),
            status: CheckStatus::Warn,
            detail: format!("{found} lock file(s) present; re-run with --fix to clear orphans"),
        }
    }
}

fn walk_lock_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().map(|e| e == "lock").unwrap_or(false) {
                out.push(path);
            }
        }
    }
    out
}

pub fn render_text(report: &DoctorReport) -> String {
    report
        .checks
        .iter()
        .map(|c| format!("[{:?}] {}: {}", c.status, c.name, c.detail))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_root_fails_without_fix() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let report = run(&missing, false);
        assert!(!report.is_healthy());
    }

    #[test]
    fn missing_store_root_is_created_with_fix() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let report = run(&missing, true);
        assert!(report.is_healthy());
        assert!(missing.is_dir());
    }

    #[test]
    fn stale_lock_files_are_removed_with_fix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schedule.json.lock"), "").unwrap();
        let report = run(dir.path(), true);
        let lock_check = report.checks.iter().find(|c| c.name == "stale_locks").unwrap();
        assert_eq!(lock_check.status, CheckStatus::Fixed);
        assert!(!dir.path().join("schedule.json.lock").exists());
    }
}
