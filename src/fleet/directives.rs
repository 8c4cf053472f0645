//! System directive store (`spec.md` §4.J).

use crate::core::atomic_store::{default_deadline, read_typed, update_json};
use crate::core::error::{MaestroError, Result};
use crate::core::model::{Directive, DirectiveStoreDoc};
use crate::core::path_resolver::directives_path;
use crate::core::time::now_rfc3339;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct DirectiveStore {
    path: PathBuf,
}

impl DirectiveStore {
    pub fn new(fleet_root: &Path) -> Self {
        DirectiveStore { path: directives_path(fleet_root) }
    }

    /// Create a directive (id absent) or update one in place (id present),
    /// bumping its version counter either way.
    pub fn upsert(&self, mut directive: Directive, updated_by: &str) -> Result<Directive> {
        update_json::<DirectiveStoreDoc, _, _>(&self.path, default_deadline(), |doc| {
            let now = now_rfc3339();
            directive.updated_at = now.clone();
            directive.updated_by = updated_by.to_string();

            if directive.id.is_empty() {
                directive.id = crate::core::time::new_event_id();
                directive.created_at = now;
                directive.version = 1;
                doc.directives.push(directive.clone());
                return Ok(directive);
            }

            match doc.directives.iter_mut().find(|d| d.id == directive.id) {
                Some(existing) => {
                    directive.created_at = existing.created_at.clone();
                    directive.version = existing.version + 1;
                    *existing = directive.clone();
                    Ok(directive)
                }
                None => {
                    directive.created_at = now;
                    directive.version = 1;
                    doc.directives.push(directive.clone());
                    Ok(directive)
                }
            }
        })
    }

    pub fn archive(&self, id: &str) -> Result<Directive> {
        update_json::<DirectiveStoreDoc, _, _>(&self.path, default_deadline(), |doc| {
            let directive = doc
                .directives
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| MaestroError::NotFound(format!("directive '{id}' not found")))?;
            directive.archived_at = Some(now_rfc3339());
            Ok(directive.clone())
        })
    }

    /// List directives; archived entries are excluded unless requested,
    /// but never deleted from the underlying store (`spec.md` §4.J).
    pub fn list(&self, include_archived: bool) -> Result<Vec<Directive>> {
        let doc: DirectiveStoreDoc = read_typed(&self.path)?;
        Ok(doc
            .directives
            .into_iter()
            .filter(|d| include_archived || d.archived_at.is_none())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_without_id_creates_and_assigns_version_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectiveStore::new(dir.path());
        let created = store
            .upsert(Directive { text: "Follow fire code".into(), scope: "global".into(), ..Default::default() }, "commander")
            .unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.version, 1);
    }

    #[test]
    fn upsert_with_id_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectiveStore::new(dir.path());
        let created = store
            .upsert(Directive { text: "Follow fire code".into(), ..Default::default() }, "commander")
            .unwrap();
        let updated = store
            .upsert(Directive { id: created.id.clone(), text: "Follow amended fire code".into(), ..Default::default() }, "commander")
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn archive_excludes_from_default_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectiveStore::new(dir.path());
        let created = store.upsert(Directive { text: "x".into(), ..Default::default() }, "commander").unwrap();
        store.archive(&created.id).unwrap();
        assert!(store.list(false).unwrap().is_empty());
        assert_eq!(store.list(true).unwrap().len(), 1);
    }
}
