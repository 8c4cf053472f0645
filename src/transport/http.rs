//! JSON HTTP routes for the workspace UI and the command center
//! (`spec.md` §4.G).

use crate::core::error::MaestroError;
use crate::core::model::{ConversationMessage, NoteSourcePage, ScheduleItem, ScheduleItemStatus, ScheduleItemType};
use crate::core::path_resolver as paths;
use crate::core::runtime::Runtime;
use crate::fleet::aggregator::node_status_for;
use crate::fleet::actions::{dispatch, ActionRequest};
use crate::tools;
use axum::extract::{Path as AxPath, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Error envelope: `{error:{kind, message, detail?}}` aligned to
/// `err.http_status()` (`spec.md` §6).
impl IntoResponse for MaestroError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({ "error": { "kind": self.kind(), "message": self.to_string() } });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, MaestroError>;

pub fn routes() -> Router<Runtime> {
    Router::new()
        .route("/api/projects", get(list_projects))
        .route("/{slug}/api/project", get(get_project))
        .route("/{slug}/api/pages", get(list_pages))
        .route("/{slug}/api/pages/{page}", get(get_page))
        .route("/{slug}/api/pages/{page}/regions", get(list_regions))
        .route("/{slug}/api/pages/{page}/regions/{id}", get(get_region))
        .route("/{slug}/api/pages/{page}/image", get(page_asset_image))
        .route("/{slug}/api/pages/{page}/thumb", get(page_asset_thumb))
        .route("/{slug}/api/pages/{page}/regions/{id}/crop", get(region_asset_crop))
        .route("/{slug}/api/workspaces", get(list_workspaces).post(create_workspace))
        .route("/{slug}/api/workspaces/{ws}", get(get_workspace))
        .route("/{slug}/api/workspaces/{ws}/images/{file}", get(workspace_asset_image))
        .route("/{slug}/api/notes", get(get_notes).post(add_note))
        .route("/{slug}/api/schedule", get(get_schedule))
        .route("/{slug}/api/schedule/timeline", get(get_timeline))
        .route("/api/command-center/state", get(command_center_state))
        .route("/api/command-center/projects/{slug}", get(command_center_project))
        .route("/api/command-center/nodes/{slug}/status", get(node_status))
        .route("/api/command-center/nodes/{slug}/conversation", get(get_conversation))
        .route("/api/command-center/nodes/{slug}/conversation/send", post(send_conversation_message))
        .route("/api/command-center/fleet-registry", get(fleet_registry))
        .route("/api/command-center/actions", post(run_action))
        .route("/api/system/awareness", get(awareness))
}

// ---------------------------------------------------------------------
// Workspace UI: knowledge endpoints
// ---------------------------------------------------------------------

async fn list_projects(State(runtime): State<Runtime>) -> ApiResult<Vec<crate::core::model::ProjectMeta>> {
    Ok(Json(crate::core::loader::list_projects(&runtime.config.store_root)?))
}

async fn get_project(State(runtime): State<Runtime>, AxPath(slug): AxPath<String>) -> ApiResult<tools::ProjectContext> {
    Ok(Json(tools::project_context(&runtime, &slug)?))
}

#[derive(Deserialize)]
struct PageFilter {
    discipline: Option<String>,
}

async fn list_pages(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
    Query(filter): Query<PageFilter>,
) -> ApiResult<Vec<crate::core::model::PageMeta>> {
    Ok(Json(tools::list_pages(&runtime, &slug, filter.discipline.as_deref())?))
}

async fn get_page(
    State(runtime): State<Runtime>,
    AxPath((slug, page)): AxPath<(String, String)>,
) -> ApiResult<crate::core::model::Pass1> {
    Ok(Json(tools::get_sheet_summary(&runtime, &slug, &page)?))
}

async fn list_regions(
    State(runtime): State<Runtime>,
    AxPath((slug, page)): AxPath<(String, String)>,
) -> ApiResult<Vec<String>> {
    Ok(Json(tools::list_regions(&runtime, &slug, &page)?))
}

async fn get_region(
    State(runtime): State<Runtime>,
    AxPath((slug, page, id)): AxPath<(String, String, String)>,
) -> ApiResult<crate::core::model::Pass2> {
    Ok(Json(tools::get_region_detail(&runtime, &slug, &page, &id)?))
}

/// Serve a page/region raster asset directly from disk with range-request
/// support (`spec.md` §4.G), delegating to `tower_http::services::ServeFile`
/// rather than re-implementing conditional/range handling by hand.
async fn serve_disk_asset(path: std::path::PathBuf, request: Request<axum::body::Body>) -> Response {
    if !path.is_file() {
        return MaestroError::NotFound(format!("asset {} not found", path.display())).into_response();
    }
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(infallible) => match infallible {},
    }
}

async fn page_asset_image(
    State(runtime): State<Runtime>,
    AxPath((slug, page)): AxPath<(String, String)>,
    request: Request<axum::body::Body>,
) -> Response {
    match paths::project_root(&runtime.config.store_root, &slug) {
        Ok(root) => serve_disk_asset(paths::page_dir(&root, &page).join("page.png"), request).await,
        Err(e) => e.into_response(),
    }
}

async fn page_asset_thumb(
    State(runtime): State<Runtime>,
    AxPath((slug, page)): AxPath<(String, String)>,
    request: Request<axum::body::Body>,
) -> Response {
    match paths::project_root(&runtime.config.store_root, &slug) {
        Ok(root) => serve_disk_asset(paths::page_dir(&root, &page).join("thumb.png"), request).await,
        Err(e) => e.into_response(),
    }
}

async fn region_asset_crop(
    State(runtime): State<Runtime>,
    AxPath((slug, page, id)): AxPath<(String, String, String)>,
    request: Request<axum::body::Body>,
) -> Response {
    match paths::project_root(&runtime.config.store_root, &slug) {
        Ok(root) => serve_disk_asset(paths::region_dir(&root, &page, &id).join("crop.png"), request).await,
        Err(e) => e.into_response(),
    }
}

async fn workspace_asset_image(
    State(runtime): State<Runtime>,
    AxPath((slug, ws, file)): AxPath<(String, String, String)>,
    request: Request<axum::body::Body>,
) -> Response {
    match paths::project_root(&runtime.config.store_root, &slug) {
        Ok(root) => {
            let path = paths::workspaces_dir(&root).join(&ws).join("images").join(&file);
            serve_disk_asset(path, request).await
        }
        Err(e) => e.into_response(),
    }
}

// ---------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------

async fn list_workspaces(State(runtime): State<Runtime>, AxPath(slug): AxPath<String>) -> ApiResult<Vec<String>> {
    Ok(Json(tools::workspaces::list_workspaces(&runtime, &slug)?))
}

#[derive(Deserialize)]
struct CreateWorkspaceBody {
    slug: String,
    #[serde(default)]
    title: String,
}

async fn create_workspace(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
    Json(body): Json<CreateWorkspaceBody>,
) -> ApiResult<crate::core::model::Workspace> {
    Ok(Json(tools::workspaces::create_workspace(&runtime, &slug, &body.slug, &body.title)?))
}

async fn get_workspace(
    State(runtime): State<Runtime>,
    AxPath((slug, ws)): AxPath<(String, String)>,
) -> ApiResult<crate::core::model::Workspace> {
    Ok(Json(tools::workspaces::get_workspace(&runtime, &slug, &ws)?))
}

// ---------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------

async fn get_notes(State(runtime): State<Runtime>, AxPath(slug): AxPath<String>) -> ApiResult<crate::core::model::ProjectNotes> {
    Ok(Json(tools::notes::get_project_notes(&runtime, &slug)?))
}

#[derive(Deserialize)]
struct AddNoteBody {
    text: String,
    #[serde(default)]
    category_id: String,
    #[serde(default)]
    source_pages: Vec<NoteSourcePage>,
}

async fn add_note(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
    Json(body): Json<AddNoteBody>,
) -> ApiResult<crate::core::model::ProjectNote> {
    Ok(Json(tools::notes::add_note(&runtime, &slug, &body.text, &body.category_id, body.source_pages)?))
}

// ---------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------

async fn get_schedule(State(runtime): State<Runtime>, AxPath(slug): AxPath<String>) -> ApiResult<crate::core::model::Schedule> {
    Ok(Json(tools::schedule::get_schedule_status(&runtime, &slug)?))
}

#[derive(Deserialize)]
struct TimelineQuery {
    month: String,
    #[serde(default)]
    include_empty_days: bool,
}

async fn get_timeline(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<tools::schedule::Timeline> {
    Ok(Json(tools::schedule::get_schedule_timeline(&runtime, &slug, &query.month, query.include_empty_days)?))
}

/// Parse a raw schedule-item JSON body, clamping unknown `type`/`status`
/// strings to their documented defaults rather than rejecting the request
/// (`spec.md` §4.D, §6 — unknown enum values never fail a call).
#[allow(dead_code)]
pub fn parse_schedule_item(value: Value) -> ScheduleItem {
    let mut item: ScheduleItem = serde_json::from_value(strip_enum_fields(&value)).unwrap_or_default();
    if let Some(raw) = value.get("type").and_then(Value::as_str) {
        item.r#type = ScheduleItemType::parse_or_default(raw).0;
    }
    if let Some(raw) = value.get("status").and_then(Value::as_str) {
        item.status = ScheduleItemStatus::parse_or_default(raw).0;
    }
    item
}

fn strip_enum_fields(value: &Value) -> Value {
    let mut object = value.clone();
    if let Some(map) = object.as_object_mut() {
        map.remove("type");
        map.remove("status");
    }
    object
}

// ---------------------------------------------------------------------
// Command Center
// ---------------------------------------------------------------------

async fn command_center_state(State(runtime): State<Runtime>) -> ApiResult<crate::fleet::aggregator::AwarenessSnapshot> {
    Ok(Json(runtime.aggregator.snapshot()?))
}

async fn command_center_project(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
) -> ApiResult<tools::ProjectContext> {
    Ok(Json(tools::project_context(&runtime, &slug)?))
}

async fn node_status(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
) -> ApiResult<crate::fleet::aggregator::NodeStatus> {
    let agent = runtime
        .registry
        .find(&slug)?
        .ok_or_else(|| MaestroError::NotFound(format!("agent '{slug}' not registered")))?;
    Ok(Json(node_status_for(&runtime.config.store_root, &agent, runtime.config.heartbeat_ttl_seconds)))
}

async fn fleet_registry(State(runtime): State<Runtime>) -> ApiResult<Vec<crate::core::model::FleetAgent>> {
    Ok(Json(runtime.registry.list()?))
}

async fn awareness(State(runtime): State<Runtime>) -> ApiResult<crate::fleet::aggregator::AwarenessSnapshot> {
    Ok(Json(runtime.aggregator.snapshot()?))
}

async fn run_action(
    State(runtime): State<Runtime>,
    Json(body): Json<ActionRequest>,
) -> ApiResult<crate::fleet::actions::ActionResult> {
    Ok(Json(dispatch(&runtime, body)?))
}

#[derive(Deserialize)]
pub struct ConversationSendBody {
    pub message: String,
    pub source: String,
}

/// `POST /api/command-center/nodes/{slug}/conversation/send` — the
/// chain-of-command guard (`spec.md` §4.H): rejects unless the target is a
/// registered, non-archived project agent, and the request came from the
/// command-center UI.
pub fn enforce_chain_of_command(
    runtime: &Runtime,
    target_slug: &str,
    body: &ConversationSendBody,
) -> Result<(), MaestroError> {
    if body.source != "command_center_ui" {
        return Err(MaestroError::Forbidden("source must be command_center_ui".to_string()));
    }
    let agent = runtime
        .registry
        .find(target_slug)?
        .ok_or_else(|| MaestroError::Forbidden(format!("agent '{target_slug}' not registered")))?;
    if agent.archived {
        return Err(MaestroError::Forbidden(format!("agent '{target_slug}' is archived")));
    }
    if agent.role != Some(crate::core::model::AgentRole::Project) {
        return Err(MaestroError::Forbidden(format!("agent '{target_slug}' is not a project role")));
    }
    Ok(())
}

async fn get_conversation(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
) -> ApiResult<Vec<ConversationMessage>> {
    let path = paths::conversation_path(&runtime.config.store_root, &slug);
    let log: crate::core::model::ConversationLog = crate::core::atomic_store::read_typed(&path)?;
    Ok(Json(log.messages))
}

async fn send_conversation_message(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
    Json(body): Json<ConversationSendBody>,
) -> ApiResult<ConversationMessage> {
    enforce_chain_of_command(&runtime, &slug, &body)?;
    let entry = ConversationMessage {
        source: body.source,
        message: body.message,
        sent_at: crate::core::time::now_rfc3339(),
    };
    let path = paths::conversation_path(&runtime.config.store_root, &slug);
    let stored = crate::core::atomic_store::update_json::<crate::core::model::ConversationLog, _, _>(
        &path,
        crate::core::atomic_store::default_deadline(),
        |log| {
            log.messages.push(entry.clone());
            Ok(entry.clone())
        },
    )?;
    Ok(Json(stored))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_schedule_item_clamps_unknown_type() {
        let item = parse_schedule_item(json!({"title": "x", "type": "bogus", "status": "also_bogus"}));
        assert_eq!(item.r#type, ScheduleItemType::Activity);
        assert_eq!(item.status, ScheduleItemStatus::Pending);
    }

    #[test]
    fn chain_of_command_rejects_archived_target() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime::for_test(dir.path());
        runtime.registry.register("agent-a", "alpha", "Agent A", crate::core::model::AgentRole::Project).unwrap();
        runtime.registry.archive("agent-a").unwrap();
        let body = ConversationSendBody { message: "hi".into(), source: "command_center_ui".into() };
        let err = enforce_chain_of_command(&runtime, "agent-a", &body).unwrap_err();
        assert_eq!(err.kind(), "Forbidden");
    }

    #[test]
    fn chain_of_command_rejects_non_ui_source() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime::for_test(dir.path());
        runtime.registry.register("agent-a", "alpha", "Agent A", crate::core::model::AgentRole::Project).unwrap();
        let body = ConversationSendBody { message: "hi".into(), source: "someone_else".into() };
        let err = enforce_chain_of_command(&runtime, "agent-a", &body).unwrap_err();
        assert_eq!(err.kind(), "Forbidden");
    }
}
