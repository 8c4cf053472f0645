//! `search`: rank pages against a free-text query (`spec.md` §4.E).

use crate::core::error::Result;
use crate::core::loader;
use crate::core::output::compact_line;
use crate::core::path_resolver as paths;
use crate::core::runtime::Runtime;
use serde::Serialize;

const SUMMARY_MAX_CHARS: usize = 380;
const MAX_REFS_PER_TERM: usize = 80;
const PAGE_NAME_SCORE: i64 = 5;
const KEYWORD_SCORE: i64 = 3;
const MATERIAL_SCORE: i64 = 2;
const MAX_REASONS: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub page_name: String,
    pub score: i64,
    pub reasons: Vec<String>,
    pub discipline: String,
    pub summary: String,
}

/// Score every page in the project against `query` (case-insensitive),
/// combining page-name substring matches with keyword/material index
/// hits, then rank deterministically: score desc, page-name asc.
pub fn search(runtime: &Runtime, slug: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let query_lower = query.to_lowercase();
    if query_lower.is_empty() {
        return Ok(Vec::new());
    }

    let pages = super::all_page_names(&project_root)?;
    let mut scored: std::collections::HashMap<String, (i64, Vec<String>)> = std::collections::HashMap::new();

    for page in &pages {
        if page.to_lowercase().contains(&query_lower) {
            let entry = scored.entry(page.clone()).or_insert((0, Vec::new()));
            entry.0 += PAGE_NAME_SCORE;
            entry.1.push("page_name".to_string());
        }
    }

    let index_path = project_root.join("index.json");
    let index: crate::core::model::KnowledgeIndex = crate::core::atomic_store::read_typed(&index_path)?;

    for (term, refs) in &index.keyword {
        if term.to_lowercase().contains(&query_lower) {
            let mut seen_pages = std::collections::HashSet::new();
            for idx_ref in refs.iter().take(MAX_REFS_PER_TERM) {
                if seen_pages.insert(idx_ref.page.clone()) {
                    let entry = scored.entry(idx_ref.page.clone()).or_insert((0, Vec::new()));
                    entry.0 += KEYWORD_SCORE;
                    entry.1.push(format!("keyword:{term}"));
                }
            }
        }
    }

    for (material, refs) in &index.material {
        if material.to_lowercase().contains(&query_lower) {
            let mut seen_pages = std::collections::HashSet::new();
            for idx_ref in refs.iter().take(MAX_REFS_PER_TERM) {
                if seen_pages.insert(idx_ref.page.clone()) {
                    let entry = scored.entry(idx_ref.page.clone()).or_insert((0, Vec::new()));
                    entry.0 += MATERIAL_SCORE;
                    entry.1.push(format!("material:{material}"));
                }
            }
        }
    }

    let mut ranked: Vec<(String, i64, Vec<String>)> = scored
        .into_iter()
        .map(|(page, (score, reasons))| (page, score, reasons))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);

    let mut hits = Vec::with_capacity(ranked.len());
    for (page_name, score, mut reasons) in ranked {
        reasons.truncate(MAX_REASONS);
        let pass1 = loader::load_pass1_lenient(&project_root, &page_name);
        let (discipline, summary) = match pass1 {
            Some(p) => (p.discipline, compact_line(&p.sheet_reflection, SUMMARY_MAX_CHARS)),
            None => (String::new(), String::new()),
        };
        hits.push(SearchHit { page_name, score, reasons, discipline, summary });
    }
    Ok(hits)
}
