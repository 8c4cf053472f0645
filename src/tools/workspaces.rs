//! Workspace tool operations (`spec.md` §4.E, backed by `core::mutator`).

use crate::core::error::Result;
use crate::core::model::{BBox, Workspace};
use crate::core::mutator;
use crate::core::path_resolver as paths;
use crate::core::runtime::Runtime;
use crate::events::Event;
use crate::tools::list_workspace_slugs;

pub fn list_workspaces(runtime: &Runtime, slug: &str) -> Result<Vec<String>> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    list_workspace_slugs(&project_root)
}

pub fn get_workspace(runtime: &Runtime, slug: &str, ws_slug: &str) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    crate::core::atomic_store::read_typed(&paths::workspace_path(&project_root, ws_slug))
}

fn emit(runtime: &Runtime, slug: &str, ws_slug: &str) {
    runtime.event_bus.publish(Event::WorkspaceUpdated {
        project_slug: slug.to_string(),
        workspace_slug: ws_slug.to_string(),
    });
}

pub fn create_workspace(runtime: &Runtime, slug: &str, ws_slug: &str, title: &str) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let ws = mutator::create_or_get_workspace(&project_root, ws_slug, title)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

pub fn add_page(runtime: &Runtime, slug: &str, ws_slug: &str, page_name: &str) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let pages = crate::tools::all_page_names(&project_root)?;
    let resolved = paths::resolve_page_idempotent(page_name, &pages)?;
    let ws = mutator::add_page(&project_root, ws_slug, &resolved)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

pub fn remove_page(runtime: &Runtime, slug: &str, ws_slug: &str, page_name: &str) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let ws = mutator::remove_page(&project_root, ws_slug, page_name)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

pub fn select_pointers(
    runtime: &Runtime,
    slug: &str,
    ws_slug: &str,
    page_name: &str,
    pointer_ids: &[String],
) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let ws = mutator::select_pointers(&project_root, ws_slug, page_name, pointer_ids)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

pub fn deselect_pointers(
    runtime: &Runtime,
    slug: &str,
    ws_slug: &str,
    page_name: &str,
    pointer_ids: &[String],
) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let ws = mutator::deselect_pointers(&project_root, ws_slug, page_name, pointer_ids)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

pub fn add_description(
    runtime: &Runtime,
    slug: &str,
    ws_slug: &str,
    page_name: &str,
    description: &str,
) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let ws = mutator::set_page_description(&project_root, ws_slug, page_name, description)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

pub fn set_custom_highlight(
    runtime: &Runtime,
    slug: &str,
    ws_slug: &str,
    page_name: &str,
    bbox: BBox,
    label: &str,
) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let ws = mutator::add_custom_highlight(&project_root, ws_slug, page_name, bbox, label)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

pub fn clear_custom_highlights(runtime: &Runtime, slug: &str, ws_slug: &str, page_name: &str) -> Result<Workspace> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let ws = mutator::clear_custom_highlights(&project_root, ws_slug, page_name)?;
    emit(runtime, slug, ws_slug);
    Ok(ws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project(dir: &std::path::Path) {
        fs::write(dir.join("project.json"), r#"{"slug":"root"}"#).unwrap();
        fs::create_dir_all(dir.join("pages/A101")).unwrap();
        fs::write(dir.join("pages/A101/pass1.json"), "{}").unwrap();
    }

    #[test]
    fn create_add_then_list_workspace() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        let runtime = Runtime::for_test(dir.path());
        create_workspace(&runtime, "root", "coord", "Coordination").unwrap();
        add_page(&runtime, "root", "coord", "A101").unwrap();
        let slugs = list_workspaces(&runtime, "root").unwrap();
        assert_eq!(slugs, vec!["coord".to_string()]);
        let ws = get_workspace(&runtime, "root", "coord").unwrap();
        assert_eq!(ws.pages.len(), 1);
    }
}
