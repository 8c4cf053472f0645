//! Debounced recursive filesystem watcher over the store root
//! (`spec.md` §4.F).
//!
//! Grounded on the mpsc-channel-plus-background-task shape used for
//! filesystem indexing in the broader example pack: `notify-debouncer-mini`
//! collects raw filesystem events on a background thread and forwards
//! debounced batches over a std channel, which a tokio task drains and
//! translates into typed [`Event`]s published on the [`EventBus`].

use crate::events::bus::{Event, EventBus};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, warn};

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(150);

/// Start watching `store_root` for changes, publishing translated events
/// onto `bus` until the returned debouncer is dropped. The debouncer must
/// be kept alive by the caller (typically stashed in `Runtime`) for the
/// watch to continue.
pub fn spawn_watcher(
    store_root: PathBuf,
    bus: EventBus,
) -> notify_debouncer_mini::Debouncer<notify_debouncer_mini::notify::RecommendedWatcher> {
    let (tx, rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(DEBOUNCE_WINDOW, move |result| {
        let _ = tx.send(result);
    })
    .expect("failed to construct filesystem debouncer");

    if let Err(e) = debouncer
        .watcher()
        .watch(&store_root, RecursiveMode::Recursive)
    {
        error!(root = %store_root.display(), error = %e, "failed to start store watcher");
    }

    let root_for_task = store_root.clone();
    tokio::task::spawn_blocking(move || {
        for result in rx {
            match result {
                Ok(events) => {
                    for event in events {
                        if let Some(translated) = translate(&root_for_task, &event.path) {
                            debug!(path = %event.path.display(), "store change detected");
                            bus.publish(translated);
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "watcher error");
                    }
                }
            }
        }
    });

    debouncer
}

/// Map a raw changed path to a typed event, or `None` for paths outside
/// the knowledge-store shape we care about (lock files, temp files).
fn translate(root: &Path, changed: &Path) -> Option<Event> {
    let relative = changed.strip_prefix(root).ok()?;
    let mut parts = relative.components().map(|c| c.as_os_str().to_string_lossy().to_string());

    let file_name = changed.file_name()?.to_string_lossy();
    if file_name.ends_with(".tmp") || file_name.ends_with(".lock") {
        return None;
    }

    let first = parts.next()?;
    if file_name == "project.json" && relative.components().count() <= 2 {
        return Some(Event::ProjectAdded { slug: first });
    }

    let project_slug = first;
    let second = parts.next()?;
    match second.as_str() {
        "pages" => {
            let page_name = parts.next()?;
            if file_name == "pass1.json" {
                Some(Event::PageUpdated { project_slug, page_name })
            } else if file_name == "pass2.json" {
                let region_id = parts.last().unwrap_or_default();
                Some(Event::RegionComplete { project_slug, page_name, region_id })
            } else if changed.extension().map(|e| e == "png" || e == "jpg").unwrap_or(false) {
                Some(Event::PageImageReady {
                    project_slug,
                    page_name,
                    filename: file_name.to_string(),
                })
            } else {
                None
            }
        }
        "workspaces" => {
            let workspace_slug = parts.next()?;
            Some(Event::WorkspaceUpdated { project_slug, workspace_slug })
        }
        "schedule" => Some(Event::ScheduleUpdated { project_slug }),
        "notes" => Some(Event::NotesUpdated { project_slug }),
        ".command_center" if file_name == "heartbeat.json" => {
            Some(Event::HeartbeatUpdated { project_slug })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_pass1_update() {
        let root = Path::new("/store/alpha");
        let changed = Path::new("/store/alpha/pages/A101/pass1.json");
        match translate(root, changed) {
            Some(Event::PageUpdated { project_slug, page_name }) => {
                assert_eq!(project_slug, "alpha");
                assert_eq!(page_name, "A101");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ignores_tmp_and_lock_files() {
        let root = Path::new("/store/alpha");
        assert!(translate(root, Path::new("/store/alpha/schedule/maestro_schedule.json.tmp")).is_none());
        assert!(translate(root, Path::new("/store/alpha/schedule/maestro_schedule.json.lock")).is_none());
    }

    #[test]
    fn translates_schedule_update() {
        let root = Path::new("/store/alpha");
        let changed = Path::new("/store/alpha/schedule/maestro_schedule.json");
        matches!(translate(root, changed), Some(Event::ScheduleUpdated { .. }));
    }
}
