//! Read-side queries over a project's pages, regions and cross-references
//! (`spec.md` §4.C).
//!
//! Every function here is a pure read: no lock is taken because readers
//! never block on each other, only on a concurrent writer holding the
//! exclusive lock for the specific file being read (`core::atomic_store`).

use crate::core::atomic_store::read_typed;
use crate::core::error::{MaestroError, Result};
use crate::core::model::{CrossReference, Pass1, Pass2, PageMeta, ProjectMeta};
use crate::core::path_resolver as paths;
use std::path::Path;
use tracing::warn;

/// List every project under a store root, in slug order.
pub fn list_projects(store_root: &Path) -> Result<Vec<ProjectMeta>> {
    let slugs = paths::list_project_slugs(store_root)?;
    let mut out = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let root = paths::project_root(store_root, &slug)?;
        let project_json = root.join("project.json");
        let mut meta: ProjectMeta = read_typed(&project_json)?;
        if meta.slug.is_empty() {
            meta.slug = slug;
        }
        out.push(meta);
    }
    Ok(out)
}

/// Load a single project's metadata.
pub fn load_project(store_root: &Path, slug: &str) -> Result<ProjectMeta> {
    let root = paths::project_root(store_root, slug)?;
    let mut meta: ProjectMeta = read_typed(&root.join("project.json"))?;
    if meta.slug.is_empty() {
        meta.slug = slug.to_string();
    }
    Ok(meta)
}

/// `ListPages(project[, discipline])` (`spec.md` §4.C): page metadata for
/// every page whose `pass1.json` is present, optionally filtered to one
/// discipline. A page missing `pass1.json` is omitted (and already logged
/// by `page_meta`/`load_pass1`), never surfaced as an error here.
pub fn list_pages(project_root: &Path, discipline: Option<&str>) -> Result<Vec<PageMeta>> {
    let names = paths::list_page_names(project_root)?;
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let Ok(meta) = page_meta(project_root, &name) else { continue };
        match discipline {
            Some(d) if meta.discipline != d => {}
            _ => out.push(meta),
        }
    }
    Ok(out)
}

/// Load a page's pass-1 (sheet-level) analysis. A missing `pass1.json` is
/// logged and reported as `NotFound` rather than `Corrupt` — ingestion may
/// simply not have reached this page yet.
pub fn load_pass1(project_root: &Path, page_name: &str) -> Result<Pass1> {
    let path = paths::pass1_path(project_root, page_name);
    if !path.is_file() {
        warn!(page = page_name, "pass1.json missing, treating page as unanalyzed");
        return Err(MaestroError::NotFound(format!(
            "pass1 analysis for page '{page_name}' not found"
        )));
    }
    read_typed(&path)
}

/// Best-effort variant of [`load_pass1`] for bulk listing endpoints: a
/// missing or corrupt pass1 is logged and the page is omitted, rather than
/// failing the whole listing (`spec.md` §4.C edge cases).
pub fn load_pass1_lenient(project_root: &Path, page_name: &str) -> Option<Pass1> {
    match load_pass1(project_root, page_name) {
        Ok(p) => Some(p),
        Err(MaestroError::NotFound(_)) => None,
        Err(e) => {
            warn!(page = page_name, error = %e, "skipping page with corrupt pass1");
            None
        }
    }
}

/// Page metadata summary used by listing tools.
pub fn page_meta(project_root: &Path, page_name: &str) -> Result<PageMeta> {
    let pass1 = load_pass1(project_root, page_name)?;
    Ok(PageMeta {
        page_name: page_name.to_string(),
        discipline: pass1.discipline,
        page_type: pass1.page_type,
    })
}

/// Load a region's pass-2 (detail) analysis.
pub fn load_pass2(project_root: &Path, page_name: &str, region_id: &str) -> Result<Pass2> {
    let path = paths::pass2_path(project_root, page_name, region_id);
    if !path.is_file() {
        return Err(MaestroError::NotFound(format!(
            "region '{region_id}' on page '{page_name}' not found"
        )));
    }
    read_typed(&path)
}

/// List region ids present under a page, sorted.
pub fn list_region_ids(project_root: &Path, page_name: &str) -> Result<Vec<String>> {
    let pointers_dir = paths::page_dir(project_root, page_name).join("pointers");
    let mut ids = Vec::new();
    if pointers_dir.is_dir() {
        for entry in std::fs::read_dir(&pointers_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().to_string());
            }
        }
    }
    ids.sort();
    Ok(ids)
}

/// Cross-references declared on a page, pooling both pass-1 (sheet-level)
/// and pass-2 (region-level) references.
pub fn find_cross_references(project_root: &Path, page_name: &str) -> Result<Vec<CrossReference>> {
    let mut refs = Vec::new();
    if let Some(pass1) = load_pass1_lenient(project_root, page_name) {
        refs.extend(pass1.cross_references);
    }
    for region_id in list_region_ids(project_root, page_name)? {
        if let Ok(pass2) = load_pass2(project_root, page_name, &region_id) {
            refs.extend(pass2.cross_references);
        }
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, json: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, json).unwrap();
    }

    #[test]
    fn list_projects_multi_project_store() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("alpha/project.json"), r#"{"slug":"alpha","name":"Alpha Tower"}"#);
        write(&dir.path().join("beta/project.json"), r#"{"slug":"beta","name":"Beta Plaza"}"#);
        let projects = list_projects(dir.path()).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].slug, "alpha");
    }

    #[test]
    fn load_pass1_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pass1(dir.path(), "A101").unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn load_pass1_lenient_swallows_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_pass1_lenient(dir.path(), "A101").is_none());
    }

    #[test]
    fn find_cross_references_pools_both_passes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("pages/A101/pass1.json"),
            r#"{"cross_references":[{"target_page":"A102","label":"see detail 1"}]}"#,
        );
        write(
            &dir.path().join("pages/A101/pointers/r1/pass2.json"),
            r#"{"cross_references":[{"target_page":"S201","label":"structural ref"}]}"#,
        );
        let refs = find_cross_references(dir.path(), "A101").unwrap();
        assert_eq!(refs.len(), 2);
    }
}
