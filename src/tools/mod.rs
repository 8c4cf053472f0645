//! Named tool surface exposed to agents (`spec.md` §4.E).
//!
//! Every operation here is a typed, validated function over a `Runtime` —
//! the HTTP transport and any future agent-facing RPC surface are both
//! thin wrappers that parse a request into the matching params struct and
//! call straight through. No business logic lives in the transport layer.

pub mod notes;
pub mod schedule;
pub mod search;
pub mod workspaces;

use crate::core::error::{MaestroError, Result};
use crate::core::loader;
use crate::core::model::ProjectMeta;
use crate::core::path_resolver as paths;
use crate::core::runtime::Runtime;
use serde::Serialize;

/// `project_context`: the active project's metadata plus page/workspace
/// counts, for an agent orienting itself at the start of a session.
#[derive(Debug, Serialize)]
pub struct ProjectContext {
    pub project: ProjectMeta,
    pub page_count: usize,
    pub workspace_count: usize,
}

pub fn project_context(runtime: &Runtime, slug: &str) -> Result<ProjectContext> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let project = loader::load_project(&runtime.config.store_root, slug)?;
    let page_count = loader::list_pages(&project_root, None)?.len();
    let workspace_count = list_workspace_slugs(&project_root)?.len();
    Ok(ProjectContext { project, page_count, workspace_count })
}

#[derive(Debug, Serialize)]
pub struct AccessUrls {
    pub workspace_url: String,
    pub command_center_url: String,
}

/// `get_access_urls`: the browser URLs for a project's workspace UI and
/// the shared command-center UI.
pub fn get_access_urls(runtime: &Runtime, slug: &str) -> Result<AccessUrls> {
    paths::project_root(&runtime.config.store_root, slug)?;
    let port = runtime.config.port;
    Ok(AccessUrls {
        workspace_url: format!("http://localhost:{port}/{slug}"),
        command_center_url: format!("http://localhost:{port}/command-center"),
    })
}

/// `ListPages(project[, discipline])`.
pub fn list_pages(runtime: &Runtime, slug: &str, discipline: Option<&str>) -> Result<Vec<crate::core::model::PageMeta>> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    loader::list_pages(&project_root, discipline)
}

/// All page names on disk, for fuzzy page-token resolution — unfiltered
/// and independent of whether `pass1.json` exists yet.
pub(crate) fn all_page_names(project_root: &std::path::Path) -> Result<Vec<String>> {
    paths::list_page_names(project_root)
}

/// `get_sheet_summary`: pass-1 analysis for one page, fuzzily resolved.
pub fn get_sheet_summary(runtime: &Runtime, slug: &str, page_token: &str) -> Result<crate::core::model::Pass1> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let pages = all_page_names(&project_root)?;
    let page_name = paths::resolve_page_idempotent(page_token, &pages)?;
    loader::load_pass1(&project_root, &page_name)
}

/// `list_regions`.
pub fn list_regions(runtime: &Runtime, slug: &str, page_token: &str) -> Result<Vec<String>> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let pages = all_page_names(&project_root)?;
    let page_name = paths::resolve_page_idempotent(page_token, &pages)?;
    loader::list_region_ids(&project_root, &page_name)
}

/// `get_region_detail`: pass-2 analysis for one region.
pub fn get_region_detail(
    runtime: &Runtime,
    slug: &str,
    page_token: &str,
    region_id: &str,
) -> Result<crate::core::model::Pass2> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let pages = all_page_names(&project_root)?;
    let page_name = paths::resolve_page_idempotent(page_token, &pages)?;
    loader::load_pass2(&project_root, &page_name, region_id)
}

/// `find_cross_references`.
pub fn find_cross_references(
    runtime: &Runtime,
    slug: &str,
    page_token: &str,
) -> Result<Vec<crate::core::model::CrossReference>> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let pages = all_page_names(&project_root)?;
    let page_name = paths::resolve_page_idempotent(page_token, &pages)?;
    loader::find_cross_references(&project_root, &page_name)
}

pub(crate) fn list_workspace_slugs(project_root: &std::path::Path) -> Result<Vec<String>> {
    let dir = paths::workspaces_dir(project_root);
    let mut slugs = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                slugs.push(entry.file_name().to_string_lossy().to_string());
            }
        }
    }
    slugs.sort();
    Ok(slugs)
}

pub(crate) fn require_project_root(runtime: &Runtime, slug: &str) -> Result<std::path::PathBuf> {
    paths::project_root(&runtime.config.store_root, slug).map_err(|_| {
        MaestroError::NotFound(format!("project '{slug}' not found"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_project(root: &std::path::Path, slug: &str) {
        fs::create_dir_all(root.join(slug)).unwrap();
        fs::write(root.join(slug).join("project.json"), format!(r#"{{"slug":"{slug}","name":"Test"}}"#)).unwrap();
    }

    #[test]
    fn project_context_counts_pages_and_workspaces() {
        let dir = tempfile::tempdir().unwrap();
        make_project(dir.path(), "alpha");
        let project_root = dir.path().join("alpha");
        fs::create_dir_all(project_root.join("pages/A101")).unwrap();
        fs::write(project_root.join("pages/A101/pass1.json"), "{}").unwrap();

        let runtime = Runtime::for_test(dir.path());
        let ctx = project_context(&runtime, "alpha").unwrap();
        assert_eq!(ctx.page_count, 1);
        assert_eq!(ctx.workspace_count, 0);
    }

    #[test]
    fn get_access_urls_rejects_unknown_project() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime::for_test(dir.path());
        let err = get_access_urls(&runtime, "ghost").unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }
}
