//! Path resolution and slug/page-name normalization (`spec.md` §4.A).
//!
//! Fuzzy page-name matching and slug normalization are each a single pure
//! function with a deterministic tie-break rule, per the REDESIGN FLAGS in
//! `spec.md` §9 — not a chain of ad-hoc `if` branches.

use crate::core::error::{MaestroError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn project_slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("valid regex"))
}

/// `^[a-z0-9][a-z0-9-]*$`.
pub fn is_valid_project_slug(slug: &str) -> bool {
    project_slug_pattern().is_match(slug)
}

/// Lowercase, strip diacritics, collapse non-alphanumerics into one separator.
fn normalize(input: &str, sep: char) -> String {
    // Decompose to NFD (base char + combining marks) then drop everything
    // outside ASCII — this strips the combining diacritics and leaves the
    // unaccented base letter (e.g. "é" -> "e").
    let ascii_folded: String = input.nfd().filter(|c| c.is_ascii()).collect();
    let lower = ascii_folded.to_lowercase();

    let mut out = String::with_capacity(lower.len());
    let mut last_was_sep = false;
    for c in lower.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !out.is_empty() {
            out.push(sep);
            last_was_sep = true;
        }
    }
    while out.ends_with(sep) {
        out.pop();
    }
    out
}

/// Slug normalization in dash form, used for project slugs.
pub fn normalize_dash(input: &str) -> String {
    normalize(input, '-')
}

/// Slug normalization in underscore form, used for workspace slugs, note
/// ids, schedule item ids, and category ids.
pub fn normalize_underscore(input: &str) -> String {
    normalize(input, '_')
}

/// Normalize a page token for fuzzy matching: strip `.`, `-`, spaces to `_`.
fn normalize_page_token(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '.' | '-' | ' ' => '_',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Result of a fuzzy page-name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageMatch {
    Found(String),
    NotFound { candidates: Vec<String> },
}

/// Resolve `token` against the set of known page names, trying in order:
/// (1) exact match, (2) prefix match on normalized form, (3) substring
/// match. Ties are broken lexicographically — resolution is a pure,
/// deterministic function of `(token, pages)`.
pub fn resolve_page(token: &str, pages: &[String]) -> PageMatch {
    if let Some(exact) = pages.iter().find(|p| p.as_str() == token) {
        return PageMatch::Found(exact.clone());
    }

    let norm_token = normalize_page_token(token);
    let mut prefix_matches: Vec<&String> = pages
        .iter()
        .filter(|p| normalize_page_token(p).starts_with(&norm_token))
        .collect();
    prefix_matches.sort();
    if let Some(winner) = prefix_matches.first() {
        return PageMatch::Found((*winner).clone());
    }

    let mut substr_matches: Vec<&String> = pages
        .iter()
        .filter(|p| normalize_page_token(p).contains(&norm_token))
        .collect();
    substr_matches.sort();
    if let Some(winner) = substr_matches.first() {
        return PageMatch::Found((*winner).clone());
    }

    let mut candidates = pages.to_vec();
    candidates.sort();
    candidates.truncate(5);
    PageMatch::NotFound { candidates }
}

/// Resolution is idempotent: feeding a resolved page name back through
/// `resolve_page` returns the same page name (invariant 7, `spec.md` §8).
pub fn resolve_page_idempotent(token: &str, pages: &[String]) -> Result<String> {
    match resolve_page(token, pages) {
        PageMatch::Found(name) => Ok(name),
        PageMatch::NotFound { candidates } => Err(MaestroError::NotFound(format!(
            "page '{token}' not found; candidates: {candidates:?}"
        ))),
    }
}

/// Layout kind detected at a store root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    /// `storeRoot` itself is a single project (`project.json` at the root).
    SingleProject,
    /// `storeRoot` contains one subdirectory per project.
    MultiProject,
}

/// Detect whether `root` is a single-project or multi-project store.
pub fn detect_layout(root: &Path) -> StoreLayout {
    if root.join("project.json").is_file() {
        StoreLayout::SingleProject
    } else {
        StoreLayout::MultiProject
    }
}

/// List project slugs under a store root, sorted by directory name.
pub fn list_project_slugs(root: &Path) -> Result<Vec<String>> {
    match detect_layout(root) {
        StoreLayout::SingleProject => {
            let slug = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "project".to_string());
            Ok(vec![slug])
        }
        StoreLayout::MultiProject => {
            let mut slugs = Vec::new();
            if root.is_dir() {
                for entry in fs::read_dir(root)? {
                    let entry = entry?;
                    if !entry.file_type()?.is_dir() {
                        continue;
                    }
                    if entry.path().join("project.json").is_file() {
                        slugs.push(entry.file_name().to_string_lossy().to_string());
                    }
                }
            }
            slugs.sort();
            Ok(slugs)
        }
    }
}

/// Resolve the filesystem root of a single project within a store.
pub fn project_root(store_root: &Path, slug: &str) -> Result<PathBuf> {
    match detect_layout(store_root) {
        StoreLayout::SingleProject => Ok(store_root.to_path_buf()),
        StoreLayout::MultiProject => {
            let candidate = store_root.join(slug);
            if candidate.join("project.json").is_file() {
                Ok(candidate)
            } else {
                Err(MaestroError::NotFound(format!("project '{slug}' not found")))
            }
        }
    }
}

pub fn pages_dir(project_root: &Path) -> PathBuf {
    project_root.join("pages")
}

pub fn page_dir(project_root: &Path, page_name: &str) -> PathBuf {
    pages_dir(project_root).join(page_name)
}

pub fn pass1_path(project_root: &Path, page_name: &str) -> PathBuf {
    page_dir(project_root, page_name).join("pass1.json")
}

pub fn region_dir(project_root: &Path, page_name: &str, region_id: &str) -> PathBuf {
    page_dir(project_root, page_name)
        .join("pointers")
        .join(region_id)
}

pub fn pass2_path(project_root: &Path, page_name: &str, region_id: &str) -> PathBuf {
    region_dir(project_root, page_name, region_id).join("pass2.json")
}

pub fn workspaces_dir(project_root: &Path) -> PathBuf {
    project_root.join("workspaces")
}

pub fn workspace_path(project_root: &Path, ws_slug: &str) -> PathBuf {
    workspaces_dir(project_root).join(ws_slug).join("workspace.json")
}

pub fn project_notes_path(project_root: &Path) -> PathBuf {
    project_root.join("notes").join("project_notes.json")
}

pub fn schedule_path(project_root: &Path) -> PathBuf {
    project_root.join("schedule").join("maestro_schedule.json")
}

pub fn command_center_dir(root: &Path) -> PathBuf {
    root.join(".command_center")
}

pub fn fleet_registry_path(fleet_root: &Path) -> PathBuf {
    command_center_dir(fleet_root).join("fleet_registry.json")
}

pub fn heartbeat_path(project_root: &Path) -> PathBuf {
    command_center_dir(project_root).join("heartbeat.json")
}

pub fn directives_path(fleet_root: &Path) -> PathBuf {
    command_center_dir(fleet_root).join("system_directives.json")
}

pub fn conversation_path(fleet_root: &Path, agent_id: &str) -> PathBuf {
    command_center_dir(fleet_root).join("conversations").join(format!("{agent_id}.json"))
}

/// List page names under a project, sorted.
pub fn list_page_names(project_root: &Path) -> Result<Vec<String>> {
    let dir = pages_dir(project_root);
    let mut names = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Install-state file written by the setup/doctor CLI (`spec.md` §6).
#[derive(Debug, Clone, serde::Deserialize, Default)]
pub struct InstallState {
    #[serde(default)]
    pub active_project_slug: Option<String>,
    #[serde(default)]
    pub active_project_name: Option<String>,
    #[serde(default)]
    pub store_root: Option<String>,
}

/// Choose the active project among several candidates: prefer the slug in
/// install-state, then name match, then lexicographic-first.
pub fn select_active_project(
    slugs: &[String],
    install_state: Option<&InstallState>,
) -> Option<String> {
    if slugs.is_empty() {
        return None;
    }
    if let Some(state) = install_state {
        if let Some(preferred) = &state.active_project_slug {
            if slugs.iter().any(|s| s == preferred) {
                return Some(preferred.clone());
            }
        }
        if let Some(name) = &state.active_project_name {
            let normalized_name = normalize_dash(name);
            if let Some(found) = slugs.iter().find(|s| **s == normalized_name) {
                return Some(found.clone());
            }
        }
    }
    let mut sorted = slugs.to_vec();
    sorted.sort();
    sorted.into_iter().next()
}
