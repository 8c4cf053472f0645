//! End-to-end scenarios exercising the tool surface, the schedule
//! timeline, fleet heartbeat freshness, and the chain-of-command guard
//! together, rather than one module in isolation.

use maestro::core::config::RuntimeConfig;
use maestro::core::model::{
    AgentRole, Heartbeat, IndexRef, KnowledgeIndex, LoopState, Pass1, ProjectMeta, ScheduleItem,
    ScheduleItemType,
};
use maestro::core::path_resolver as paths;
use maestro::core::time::now_rfc3339;
use maestro::fleet::aggregator::node_status_for;
use maestro::fleet::heartbeat;
use maestro::tools;
use maestro::Runtime;
use std::fs;

fn runtime_over(store_root: &std::path::Path) -> Runtime {
    Runtime::new(RuntimeConfig { store_root: store_root.to_path_buf(), ..RuntimeConfig::default() })
}

fn scaffold_project(store_root: &std::path::Path, slug: &str) -> std::path::PathBuf {
    let root = store_root.join(slug);
    fs::create_dir_all(&root).unwrap();
    maestro::core::atomic_store::write_json(
        &root.join("project.json"),
        &ProjectMeta { slug: slug.to_string(), name: slug.to_string(), created_at: now_rfc3339() },
    )
    .unwrap();
    root
}

fn write_pass1(project_root: &std::path::Path, page: &str, discipline: &str) {
    let dir = paths::page_dir(project_root, page);
    fs::create_dir_all(&dir).unwrap();
    maestro::core::atomic_store::write_json(
        &paths::pass1_path(project_root, page),
        &Pass1 { discipline: discipline.to_string(), ..Default::default() },
    )
    .unwrap();
}

/// S1 — search ranks a page-name substring match above an unrelated page,
/// and a keyword-index hit scores three points for a page with no
/// substring overlap with the query at all.
#[test]
fn search_ranks_keyword_hits_over_unrelated_pages() {
    let dir = tempfile::tempdir().unwrap();
    let project_root = scaffold_project(dir.path(), "tower-one");
    write_pass1(&project_root, "A101_Floor_Plan_p001", "Architectural");
    write_pass1(&project_root, "A111_Floor_Finish_Plan_p001", "Architectural");

    let mut keyword = std::collections::HashMap::new();
    keyword.insert(
        "waterproofing".to_string(),
        vec![IndexRef { page: "A101_Floor_Plan_p001".to_string(), weight: 1.0 }],
    );
    let mut material = std::collections::HashMap::new();
    material.insert(
        "membrane".to_string(),
        vec![IndexRef { page: "A111_Floor_Finish_Plan_p001".to_string(), weight: 1.0 }],
    );
    maestro::core::atomic_store::write_json(
        &project_root.join("index.json"),
        &KnowledgeIndex { keyword, material, cross_refs: Default::default() },
    )
    .unwrap();

    let runtime = runtime_over(dir.path());
    let hits = tools::search::search(&runtime, "tower-one", "waterproofing", 10).unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page_name, "A101_Floor_Plan_p001");
    assert_eq!(hits[0].score, 3);
    assert!(hits[0].reasons.contains(&"keyword:waterproofing".to_string()));
}

/// S2 — a page token shorter than the full sheet name still resolves, and
/// an unmatched token reports `NotFound`.
#[test]
fn get_sheet_summary_resolves_by_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let project_root = scaffold_project(dir.path(), "tower-one");
    write_pass1(&project_root, "A101_Floor_Plan_p001", "Architectural");

    let runtime = runtime_over(dir.path());
    let full = tools::get_sheet_summary(&runtime, "tower-one", "A101_Floor_Plan_p001").unwrap();
    let short = tools::get_sheet_summary(&runtime, "tower-one", "A101").unwrap();
    assert_eq!(full.discipline, short.discipline);

    let err = tools::get_sheet_summary(&runtime, "tower-one", "A999").unwrap_err();
    assert_eq!(err.kind(), "NotFound");
}

/// S3 — concurrent `add_page` calls against the same workspace converge
/// on exactly one entry for the page, regardless of call order.
#[test]
fn concurrent_add_page_converges_on_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let project_root = scaffold_project(dir.path(), "tower-one");
    write_pass1(&project_root, "A101_Floor_Plan_p001", "Architectural");
    let runtime = runtime_over(dir.path());
    tools::workspaces::create_workspace(&runtime, "tower-one", "ws1", "Workspace One").unwrap();

    std::thread::scope(|scope| {
        for _ in 0..100 {
            let runtime = &runtime;
            scope.spawn(move || {
                tools::workspaces::add_page(runtime, "tower-one", "ws1", "A101_Floor_Plan_p001").unwrap();
            });
        }
    });

    let ws = tools::workspaces::get_workspace(&runtime, "tower-one", "ws1").unwrap();
    let matches = ws.pages.iter().filter(|p| p.page_name == "A101_Floor_Plan_p001").count();
    assert_eq!(matches, 1);
}

/// S4 — the schedule timeline buckets dated items into day rows sorted
/// `date desc` and routes undated items into `unscheduled`.
#[test]
fn schedule_timeline_buckets_dated_items_and_collects_unscheduled() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), "tower-one");
    let runtime = runtime_over(dir.path());

    for (title, due_date) in [
        ("Pour slab", "2026-02-05"),
        ("Topping out", "2026-02-19"),
        ("Owner walkthrough", ""),
    ] {
        tools::schedule::upsert_schedule_item(
            &runtime,
            "tower-one",
            ScheduleItem {
                title: title.to_string(),
                r#type: ScheduleItemType::Milestone,
                due_date: due_date.to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    }

    let timeline = tools::schedule::get_schedule_timeline(&runtime, "tower-one", "2026-02", false).unwrap();
    assert_eq!(timeline.days.len(), 2);
    assert_eq!(timeline.days[0].date, "2026-02-19");
    assert_eq!(timeline.days[1].date, "2026-02-05");
    assert_eq!(timeline.days[0].items.len(), 1);
    assert_eq!(timeline.unscheduled.len(), 1);
    assert_eq!(timeline.unscheduled[0].title, "Owner walkthrough");
}

/// S5 — a heartbeat older than the TTL reports as stale, idle, with a
/// summary naming the staleness.
#[test]
fn stale_heartbeat_reports_idle_and_not_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let project_root = scaffold_project(dir.path(), "tower-one");
    let stale_at = (chrono::Utc::now() - chrono::Duration::seconds(200)).to_rfc3339();
    maestro::core::atomic_store::write_json(
        &paths::heartbeat_path(&project_root),
        &Heartbeat { loop_state: LoopState::Computing, summary: "working".to_string(), updated_at: stale_at, metrics: Default::default() },
    )
    .unwrap();

    let runtime = runtime_over(dir.path());
    let agent = runtime.registry.register("agent-tower-one", "tower-one", "Tower One Agent", AgentRole::Project).unwrap();
    let status = node_status_for(&runtime.config.store_root, &agent, heartbeat::DEFAULT_HEARTBEAT_TTL_SECONDS);

    assert!(!status.is_fresh);
    assert_eq!(status.loop_state, LoopState::Idle);
    assert!(status.summary.to_lowercase().contains("stale"));
}

/// S6 — the chain-of-command guard rejects a conversation send aimed at
/// an archived agent, over the actual HTTP router rather than the guard
/// function in isolation.
#[tokio::test]
async fn chain_of_command_guard_rejects_archived_agent_over_http() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path(), "tower-one");
    let runtime = runtime_over(dir.path());
    runtime.registry.register("agent-commander", "fleet", "Commander", AgentRole::Commander).unwrap();
    runtime.registry.register("agent-tower-one", "tower-one", "Tower One Agent", AgentRole::Project).unwrap();
    runtime.registry.archive("agent-tower-one").unwrap();

    let app = maestro::transport::build_router(runtime);
    let request = Request::builder()
        .method("POST")
        .uri("/api/command-center/nodes/agent-tower-one/conversation/send")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"message":"x","source":"command_center_ui"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
