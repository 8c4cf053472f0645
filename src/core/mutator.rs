//! Read-modify-write operations on workspaces, project notes, and the
//! schedule (`spec.md` §4.D).
//!
//! Every operation here goes through `atomic_store::update_json` so the
//! read, the mutation, and the write happen under a single exclusive
//! lock — concurrent callers serialize rather than racing a read-then-write
//! against each other.

use crate::core::atomic_store::{default_deadline, update_json};
use crate::core::error::{MaestroError, Result};
use crate::core::model::*;
use crate::core::path_resolver as paths;
use crate::core::time::now_rfc3339;
use std::path::Path;

fn workspace_slug_dir(project_root: &Path, ws_slug: &str) -> std::path::PathBuf {
    paths::workspaces_dir(project_root).join(ws_slug)
}

/// Create a workspace if absent, or return the existing one untouched.
pub fn create_or_get_workspace(project_root: &Path, slug: &str, title: &str) -> Result<Workspace> {
    let path = paths::workspace_path(project_root, slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        if ws.slug.is_empty() {
            ws.slug = slug.to_string();
            ws.title = title.to_string();
            ws.created_at = now_rfc3339();
        }
        Ok(ws.clone())
    })
}

fn find_page_mut<'a>(ws: &'a mut Workspace, page_name: &str) -> Option<&'a mut WorkspacePage> {
    ws.pages.iter_mut().find(|p| p.page_name == page_name)
}

/// Add a page to a workspace, idempotently — adding an already-present page
/// is a no-op rather than a duplicate entry or an error.
pub fn add_page(project_root: &Path, ws_slug: &str, page_name: &str) -> Result<Workspace> {
    let path = paths::workspace_path(project_root, ws_slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        if find_page_mut(ws, page_name).is_none() {
            ws.pages.push(WorkspacePage {
                page_name: page_name.to_string(),
                ..Default::default()
            });
        }
        Ok(ws.clone())
    })
}

/// Remove a page from a workspace. Removing an absent page is a no-op.
pub fn remove_page(project_root: &Path, ws_slug: &str, page_name: &str) -> Result<Workspace> {
    let path = paths::workspace_path(project_root, ws_slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        ws.pages.retain(|p| p.page_name != page_name);
        Ok(ws.clone())
    })
}

/// Add pointer (region) ids to a page's selection, deduplicated.
pub fn select_pointers(
    project_root: &Path,
    ws_slug: &str,
    page_name: &str,
    pointer_ids: &[String],
) -> Result<Workspace> {
    let path = paths::workspace_path(project_root, ws_slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        let page = find_page_mut(ws, page_name).ok_or_else(|| {
            MaestroError::NotFound(format!("page '{page_name}' not in workspace '{ws_slug}'"))
        })?;
        for id in pointer_ids {
            if !page.selected_pointers.contains(id) {
                page.selected_pointers.push(id.clone());
            }
        }
        Ok(ws.clone())
    })
}

/// Remove pointer ids from a page's selection.
pub fn deselect_pointers(
    project_root: &Path,
    ws_slug: &str,
    page_name: &str,
    pointer_ids: &[String],
) -> Result<Workspace> {
    let path = paths::workspace_path(project_root, ws_slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        let page = find_page_mut(ws, page_name).ok_or_else(|| {
            MaestroError::NotFound(format!("page '{page_name}' not in workspace '{ws_slug}'"))
        })?;
        page.selected_pointers.retain(|id| !pointer_ids.contains(id));
        Ok(ws.clone())
    })
}

/// Set (overwrite) the free-text description on a workspace page.
pub fn set_page_description(
    project_root: &Path,
    ws_slug: &str,
    page_name: &str,
    description: &str,
) -> Result<Workspace> {
    let path = paths::workspace_path(project_root, ws_slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        let page = find_page_mut(ws, page_name).ok_or_else(|| {
            MaestroError::NotFound(format!("page '{page_name}' not in workspace '{ws_slug}'"))
        })?;
        page.description = description.to_string();
        Ok(ws.clone())
    })
}

/// Append a user-drawn highlight region to a workspace page.
pub fn add_custom_highlight(
    project_root: &Path,
    ws_slug: &str,
    page_name: &str,
    bbox: BBox,
    label: &str,
) -> Result<Workspace> {
    if !bbox.is_valid() {
        return Err(MaestroError::InvalidArgument(format!(
            "bbox {bbox:?} is not a valid rectangle"
        )));
    }
    let path = paths::workspace_path(project_root, ws_slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        let page = find_page_mut(ws, page_name).ok_or_else(|| {
            MaestroError::NotFound(format!("page '{page_name}' not in workspace '{ws_slug}'"))
        })?;
        page.custom_highlights.push(CustomHighlight {
            id: crate::core::time::new_event_id(),
            bbox,
            label: label.to_string(),
        });
        Ok(ws.clone())
    })
}

/// Clear all user-drawn highlights on a workspace page.
pub fn clear_custom_highlights(project_root: &Path, ws_slug: &str, page_name: &str) -> Result<Workspace> {
    let path = paths::workspace_path(project_root, ws_slug);
    update_json::<Workspace, _, _>(&path, default_deadline(), |ws| {
        let page = find_page_mut(ws, page_name).ok_or_else(|| {
            MaestroError::NotFound(format!("page '{page_name}' not in workspace '{ws_slug}'"))
        })?;
        page.custom_highlights.clear();
        Ok(ws.clone())
    })
}

// ---------------------------------------------------------------------
// Project notes
// ---------------------------------------------------------------------

fn bump_notes(notes: &mut ProjectNotes) {
    notes.version += 1;
    notes.updated_at = now_rfc3339();
}

/// Create a note category, or update its name/color/order if it exists.
pub fn upsert_category(
    project_root: &Path,
    id: &str,
    name: &str,
    color: CategoryColor,
    order: i64,
) -> Result<ProjectNotes> {
    let path = paths::project_notes_path(project_root);
    update_json::<ProjectNotes, _, _>(&path, default_deadline(), |doc| {
        match doc.categories.iter_mut().find(|c| c.id == id) {
            Some(existing) => {
                existing.name = name.to_string();
                existing.color = color;
                existing.order = order;
            }
            None => doc.categories.push(NoteCategory {
                id: id.to_string(),
                name: name.to_string(),
                color,
                order,
            }),
        }
        bump_notes(doc);
        Ok(doc.clone())
    })
}

/// Add a new note, or update an existing one's text/category when `id` is
/// already present (`spec.md` §4.D).
pub fn add_or_update_note(
    project_root: &Path,
    id: Option<&str>,
    text: &str,
    category_id: &str,
    source_pages: Vec<NoteSourcePage>,
) -> Result<ProjectNote> {
    let path = paths::project_notes_path(project_root);
    let category_id = if category_id.is_empty() {
        GENERAL_CATEGORY_ID.to_string()
    } else {
        category_id.to_string()
    };
    update_json::<ProjectNotes, _, _>(&path, default_deadline(), |doc| {
        let now = now_rfc3339();
        if let Some(id) = id {
            if let Some(existing) = doc.notes.iter_mut().find(|n| n.id == id) {
                existing.text = text.to_string();
                existing.category_id = category_id.clone();
                existing.source_pages = source_pages.clone();
                existing.updated_at = now.clone();
                bump_notes(doc);
                return Ok(existing.clone());
            }
        }
        let note = ProjectNote {
            id: crate::core::time::new_event_id(),
            text: text.to_string(),
            category_id,
            source_pages,
            pinned: false,
            status: NoteStatus::Open,
            created_at: now.clone(),
            updated_at: now,
        };
        doc.notes.push(note.clone());
        bump_notes(doc);
        Ok(note)
    })
}

/// Update a note's open/archived status (or pin state).
pub fn update_note_state(
    project_root: &Path,
    note_id: &str,
    status: Option<NoteStatus>,
    pinned: Option<bool>,
) -> Result<ProjectNote> {
    let path = paths::project_notes_path(project_root);
    update_json::<ProjectNotes, _, _>(&path, default_deadline(), |doc| {
        let note = doc
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| MaestroError::NotFound(format!("note '{note_id}' not found")))?;
        if let Some(status) = status {
            note.status = status;
        }
        if let Some(pinned) = pinned {
            note.pinned = pinned;
        }
        note.updated_at = now_rfc3339();
        let result = note.clone();
        bump_notes(doc);
        Ok(result)
    })
}

// ---------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------

fn bump_schedule(sched: &mut Schedule) {
    sched.version += 1;
    sched.updated_at = now_rfc3339();
}

/// Create a schedule item, or update an existing one in place when `id` is
/// already present. A terminal status (`done`/`cancelled`) sets `closed_at`;
/// any non-terminal status clears `closed_at` and `close_reason`, so an
/// item reopened via a plain upsert doesn't carry a stale closure forward.
pub fn upsert_item(project_root: &Path, mut item: ScheduleItem) -> Result<ScheduleItem> {
    let path = paths::schedule_path(project_root);
    update_json::<Schedule, _, _>(&path, default_deadline(), |sched| {
        let now = now_rfc3339();
        if item.id.is_empty() {
            item.id = crate::core::time::new_event_id();
            item.created_at = now.clone();
        }
        item.updated_at = now.clone();
        if item.status.is_terminal() {
            item.closed_at = now;
        } else {
            item.closed_at = String::new();
            item.close_reason = String::new();
        }
        match sched.items.iter_mut().find(|i| i.id == item.id) {
            Some(slot) => *slot = item.clone(),
            None => sched.items.push(item.clone()),
        }
        bump_schedule(sched);
        Ok(item)
    })
}

/// Mark a schedule item as a blocking constraint with a reason.
pub fn set_constraint(project_root: &Path, item_id: &str, impact: &str) -> Result<ScheduleItem> {
    let path = paths::schedule_path(project_root);
    update_json::<Schedule, _, _>(&path, default_deadline(), |sched| {
        let item = sched
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| MaestroError::NotFound(format!("schedule item '{item_id}' not found")))?;
        item.r#type = ScheduleItemType::Constraint;
        item.status = ScheduleItemStatus::Blocked;
        item.impact = impact.to_string();
        item.updated_at = now_rfc3339();
        let result = item.clone();
        bump_schedule(sched);
        Ok(result)
    })
}

/// Close a schedule item (`done` or `cancelled`) with a reason.
pub fn close_item(
    project_root: &Path,
    item_id: &str,
    status: ScheduleItemStatus,
    reason: &str,
) -> Result<ScheduleItem> {
    if !status.is_terminal() {
        return Err(MaestroError::InvalidArgument(format!(
            "close requires a terminal status, got {status:?}"
        )));
    }
    let path = paths::schedule_path(project_root);
    update_json::<Schedule, _, _>(&path, default_deadline(), |sched| {
        let now = now_rfc3339();
        let item = sched
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| MaestroError::NotFound(format!("schedule item '{item_id}' not found")))?;
        item.status = status;
        item.close_reason = reason.to_string();
        item.closed_at = now.clone();
        item.updated_at = now;
        let result = item.clone();
        bump_schedule(sched);
        Ok(result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_page_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        create_or_get_workspace(dir.path(), "coord", "Coordination").unwrap();
        add_page(dir.path(), "coord", "A101").unwrap();
        let ws = add_page(dir.path(), "coord", "A101").unwrap();
        assert_eq!(ws.pages.len(), 1);
    }

    #[test]
    fn select_pointers_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        create_or_get_workspace(dir.path(), "coord", "Coordination").unwrap();
        add_page(dir.path(), "coord", "A101").unwrap();
        select_pointers(dir.path(), "coord", "A101", &["r1".into(), "r1".into()]).unwrap();
        let ws = select_pointers(dir.path(), "coord", "A101", &["r1".into()]).unwrap();
        assert_eq!(ws.pages[0].selected_pointers, vec!["r1".to_string()]);
    }

    #[test]
    fn add_custom_highlight_rejects_invalid_bbox() {
        let dir = tempfile::tempdir().unwrap();
        create_or_get_workspace(dir.path(), "coord", "Coordination").unwrap();
        add_page(dir.path(), "coord", "A101").unwrap();
        let bad = BBox { x0: 1.0, y0: 0.0, x1: 0.0, y1: 1.0 };
        let err = add_custom_highlight(dir.path(), "coord", "A101", bad, "bad").unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn note_upsert_then_update_state() {
        let dir = tempfile::tempdir().unwrap();
        let note = add_or_update_note(dir.path(), None, "check waterproofing", "", vec![]).unwrap();
        assert_eq!(note.category_id, GENERAL_CATEGORY_ID);
        let updated = update_note_state(dir.path(), &note.id, Some(NoteStatus::Archived), Some(true)).unwrap();
        assert_eq!(updated.status, NoteStatus::Archived);
        assert!(updated.pinned);
    }

    #[test]
    fn schedule_close_requires_terminal_status() {
        let dir = tempfile::tempdir().unwrap();
        let item = upsert_item(dir.path(), ScheduleItem { title: "Pour slab".into(), ..Default::default() }).unwrap();
        let err = close_item(dir.path(), &item.id, ScheduleItemStatus::Pending, "oops").unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
        let ok = close_item(dir.path(), &item.id, ScheduleItemStatus::Done, "poured").unwrap();
        assert!(ok.status.is_terminal());
    }

    #[test]
    fn concurrent_add_page_calls_converge_without_duplicates() {
        let dir = std::sync::Arc::new(tempfile::tempdir().unwrap());
        create_or_get_workspace(dir.path(), "coord", "Coordination").unwrap();
        std::thread::scope(|scope| {
            for i in 0..50 {
                let dir = std::sync::Arc::clone(&dir);
                scope.spawn(move || {
                    add_page(dir.path(), "coord", &format!("A{:03}", i % 10)).unwrap();
                });
            }
        });
        let ws = create_or_get_workspace(dir.path(), "coord", "Coordination").unwrap();
        assert_eq!(ws.pages.len(), 10);
    }
}
