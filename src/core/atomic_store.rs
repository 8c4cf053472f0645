//! Atomic JSON document store (`spec.md` §4.B).
//!
//! All higher layers go through this module; no component opens a JSON
//! file directly. Writes land via write-to-temp-then-rename so readers
//! never observe a torn file, and every mutation goes through a per-path
//! advisory lock with bounded-retry acquisition — the same shape as the
//! teacher's `DbBroker`/`SqlitePool` (per-path `Mutex` registry, serialized
//! writers, generous read concurrency) generalized from SQLite connections
//! to whole JSON files.

use crate::core::error::{MaestroError, Result};
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lock mode requested by a caller of `with_lock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

const RETRY_BASE_DELAY: Duration = Duration::from_millis(20);
const RETRY_MAX_DELAY: Duration = Duration::from_millis(500);

/// Read a JSON document, returning an empty object for a missing file.
/// A malformed file is reported as `Corrupt` with the offending path so a
/// human can be pointed at it directly (`spec.md` §4.C).
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| MaestroError::corrupt(path.display().to_string(), e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(serde_json::json!({})),
        Err(e) => Err(MaestroError::Io(e)),
    }
}

/// Read and deserialize into `T`, defaulting to `T::default()` for a missing
/// file.
pub fn read_typed<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let value = read_json(path)?;
    if value.as_object().map(|m| m.is_empty()).unwrap_or(false) && !path.exists() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| MaestroError::corrupt(path.display().to_string(), e))
}

/// Write a JSON document atomically: serialize to `path.tmp`, fsync, then
/// rename onto `path`. The rename is the commit point.
pub fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = tmp_path_for(path);
    let serialized = serde_json::to_vec_pretty(document)?;
    {
        let mut tmp_file = File::create(&tmp_path)?;
        use std::io::Write;
        tmp_file.write_all(&serialized)?;
        tmp_file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Acquire a per-file advisory lock (shared for read, exclusive for write)
/// and run `f`, releasing the lock on every exit path — including panics
/// unwinding through the guard's `Drop`. Acquisition retries with bounded
/// exponential backoff until `deadline` elapses, surfacing `Conflict` on
/// timeout rather than blocking forever.
pub fn with_lock<F, R>(path: &Path, mode: LockMode, deadline: Duration, f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let lock_path = lock_path_for(path);
    let in_process = in_process_lock(&lock_path);
    let started = Instant::now();
    let mut delay = RETRY_BASE_DELAY;

    loop {
        // Serialize same-process callers first; this also gives exclusive
        // writers priority over concurrent shared readers within this
        // process without relying on OS lock fairness.
        let _process_guard = match mode {
            LockMode::Exclusive => Some(
                in_process
                    .lock()
                    .map_err(|_| MaestroError::Internal("lock poisoned".into()))?,
            ),
            LockMode::Shared => None,
        };

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        let acquired = match mode {
            LockMode::Shared => file.try_lock_shared(),
            LockMode::Exclusive => file.try_lock_exclusive(),
        };

        match acquired {
            Ok(()) => {
                debug!(path = %path.display(), ?mode, "acquired store lock");
                let result = f();
                let _ = file.unlock();
                return result;
            }
            Err(_) if started.elapsed() < deadline => {
                drop(_process_guard);
                std::thread::sleep(delay.min(deadline.saturating_sub(started.elapsed())));
                delay = (delay * 2).min(RETRY_MAX_DELAY);
            }
            Err(_) => {
                warn!(path = %path.display(), ?mode, "lock acquisition timed out");
                return Err(MaestroError::Conflict(format!(
                    "could not acquire {:?} lock on {} within {:?}",
                    mode,
                    path.display(),
                    deadline
                )));
            }
        }
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

fn lock_registry() -> &'static Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn in_process_lock(path: &Path) -> Arc<Mutex<()>> {
    let mut map = lock_registry().lock().unwrap_or_else(|e| e.into_inner());
    map.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Read-modify-write a typed document under an exclusive lock: load,
/// apply `modify`, write back. Failures inside `modify` leave the file
/// unchanged because `write_json` is only reached on `Ok`.
pub fn update_json<T, F, R>(path: &Path, deadline: Duration, modify: F) -> Result<R>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnOnce(&mut T) -> Result<R>,
{
    with_lock(path, LockMode::Exclusive, deadline, || {
        let mut doc: T = read_typed(path)?;
        let result = modify(&mut doc)?;
        write_json(path, &doc)?;
        Ok(result)
    })
}

/// Default per-operation deadline (`spec.md` §5).
pub fn default_deadline() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    #[test]
    fn read_json_missing_file_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let v = read_json(&path).unwrap();
        assert_eq!(v, serde_json::json!({}));
    }

    #[test]
    fn read_json_malformed_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json(&path).unwrap_err();
        assert_eq!(err.kind(), "Corrupt");
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut doc: Map<String, i32> = Map::new();
        doc.insert("a".into(), 1);
        write_json(&path, &doc).unwrap();
        let back: Map<String, i32> = read_typed(&path).unwrap();
        assert_eq!(back.get("a"), Some(&1));
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn write_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("doc.json");
        write_json(&path, &serde_json::json!({"ok": true})).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn update_json_no_op_round_trip_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json(&path, &serde_json::json!({"x": 1})).unwrap();
        let before = fs::read_to_string(&path).unwrap();
        let _: () = update_json::<serde_json::Value, _, _>(&path, default_deadline(), |_doc| Ok(())).unwrap();
        let after = fs::read_to_string(&path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn concurrent_writers_serialize_without_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("counter.json"));
        write_json(&*path, &serde_json::json!({"count": 0})).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..20 {
                let path = Arc::clone(&path);
                scope.spawn(move || {
                    update_json::<serde_json::Value, _, _>(&path, default_deadline(), |doc| {
                        let current = doc.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
                        *doc = serde_json::json!({"count": current + 1});
                        Ok(())
                    })
                    .unwrap();
                });
            }
        });

        let final_doc: serde_json::Value = read_typed(&path).unwrap();
        assert_eq!(final_doc["count"], 20);
    }
}
