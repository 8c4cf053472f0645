//! Project notes tool operations (`spec.md` §4.E, backed by `core::mutator`).

use crate::core::error::Result;
use crate::core::model::{CategoryColor, NoteCategory, NoteSourcePage, NoteStatus, ProjectNote, ProjectNotes, GENERAL_CATEGORY_ID};
use crate::core::mutator;
use crate::core::path_resolver as paths;
use crate::core::runtime::Runtime;
use crate::events::Event;

/// `get_project_notes`: categories sorted by `(order, name)`, notes sorted
/// by `(pinned desc, updated_at desc)` (`spec.md` §4.D). The `general`
/// category always exists; it is created and persisted here the first
/// time a project's notes are loaded without one.
pub fn get_project_notes(runtime: &Runtime, slug: &str) -> Result<ProjectNotes> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let path = paths::project_notes_path(&project_root);
    let mut doc: ProjectNotes = crate::core::atomic_store::update_json(
        &path,
        crate::core::atomic_store::default_deadline(),
        |doc: &mut ProjectNotes| {
            if !doc.categories.iter().any(|c| c.id == GENERAL_CATEGORY_ID) {
                doc.categories.push(NoteCategory {
                    id: GENERAL_CATEGORY_ID.to_string(),
                    name: "General".to_string(),
                    color: CategoryColor::Slate,
                    order: 0,
                });
            }
            Ok(doc.clone())
        },
    )?;
    doc.categories.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
    doc.notes.sort_by(|a, b| {
        b.pinned.cmp(&a.pinned).then_with(|| b.updated_at.cmp(&a.updated_at))
    });
    Ok(doc)
}

pub fn upsert_note_category(
    runtime: &Runtime,
    slug: &str,
    id: &str,
    name: &str,
    color: CategoryColor,
    order: i64,
) -> Result<ProjectNotes> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let doc = mutator::upsert_category(&project_root, id, name, color, order)?;
    runtime.event_bus.publish(Event::NotesUpdated { project_slug: slug.to_string() });
    Ok(doc)
}

pub fn add_note(
    runtime: &Runtime,
    slug: &str,
    text: &str,
    category_id: &str,
    source_pages: Vec<NoteSourcePage>,
) -> Result<ProjectNote> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let note = mutator::add_or_update_note(&project_root, None, text, category_id, source_pages)?;
    runtime.event_bus.publish(Event::NotesUpdated { project_slug: slug.to_string() });
    Ok(note)
}

pub fn update_note_state(
    runtime: &Runtime,
    slug: &str,
    note_id: &str,
    status: Option<NoteStatus>,
    pinned: Option<bool>,
) -> Result<ProjectNote> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let note = mutator::update_note_state(&project_root, note_id, status, pinned)?;
    runtime.event_bus.publish(Event::NotesUpdated { project_slug: slug.to_string() });
    Ok(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn notes_sort_pinned_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("project.json"), r#"{"slug":"root"}"#).unwrap();
        let runtime = Runtime::for_test(dir.path());
        let a = add_note(&runtime, "root", "unpinned", "", vec![]).unwrap();
        let b = add_note(&runtime, "root", "pinned", "", vec![]).unwrap();
        update_note_state(&runtime, "root", &b.id, None, Some(true)).unwrap();
        let notes = get_project_notes(&runtime, "root").unwrap();
        assert_eq!(notes.notes[0].id, b.id);
        assert_eq!(notes.notes[1].id, a.id);
    }
}
