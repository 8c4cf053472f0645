//! Maestro runtime binary: serves the knowledge store over HTTP/WebSocket,
//! runs store-health checks, and exposes the tool surface over the CLI.

use clap::Parser;
use maestro::cli::{Cli, Command};
use maestro::core::config::{CliOverrides, RuntimeConfig};
use maestro::core::error::MaestroError;
use maestro::doctor;
use maestro::events::watcher;
use maestro::Runtime;
use std::process::ExitCode;

fn init_tracing() {
    let filter = std::env::var("MAESTRO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve(args) => run_server(args.store, args.port),
        Command::Up(args) => {
            if args.tui {
                tracing::warn!("the TUI dashboard is not part of the runtime core; serving headless");
            }
            run_server(None, args.port)
        }
        Command::Doctor(args) => run_doctor(args.fix, args.json),
        Command::Ingest(args) => run_ingest(args.path, args.project_name),
        Command::Tools(args) => run_tool(args.op, args.args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind(), "{e}");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn build_runtime(store_override: Option<std::path::PathBuf>, port_override: Option<u16>) -> Runtime {
    let config = RuntimeConfig::resolve(CliOverrides { store_root: store_override, port: port_override });
    Runtime::new(config)
}

fn run_server(store_override: Option<std::path::PathBuf>, port_override: Option<u16>) -> Result<(), MaestroError> {
    let runtime = build_runtime(store_override, port_override);
    let store_root = runtime.config.store_root.clone();
    let port = runtime.config.port;

    let tokio_runtime = tokio::runtime::Runtime::new().map_err(MaestroError::Io)?;
    tokio_runtime.block_on(async move {
        let _debouncer = watcher::spawn_watcher(store_root, runtime.event_bus.clone());
        let app = maestro::transport::build_router(runtime);
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(MaestroError::Io)?;
        tracing::info!(port, "maestro runtime listening");
        axum::serve(listener, app).await.map_err(MaestroError::Io)
    })
}

fn run_doctor(fix: bool, json: bool) -> Result<(), MaestroError> {
    let config = RuntimeConfig::resolve(CliOverrides::default());
    let report = doctor::run(&config.store_root, fix);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", doctor::render_text(&report));
    }
    if report.is_healthy() {
        Ok(())
    } else {
        Err(MaestroError::Internal("store has unresolved doctor findings".to_string()))
    }
}

/// Ingestion itself is an out-of-scope pipeline (`spec.md` §1 Non-goals);
/// this only ensures a project scaffold exists for that pipeline — and
/// the runtime's watcher — to write into.
fn run_ingest(path: std::path::PathBuf, project_name: Option<String>) -> Result<(), MaestroError> {
    if !path.exists() {
        return Err(MaestroError::InvalidArgument(format!("ingest source '{}' does not exist", path.display())));
    }
    let config = RuntimeConfig::resolve(CliOverrides::default());
    let name = project_name.unwrap_or_else(|| {
        path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "project".to_string())
    });
    let slug = maestro::core::path_resolver::normalize_dash(&name);
    let project_root = config.store_root.join(&slug);
    std::fs::create_dir_all(&project_root)?;
    maestro::core::atomic_store::write_json(
        &project_root.join("project.json"),
        &maestro::core::model::ProjectMeta {
            slug: slug.clone(),
            name,
            created_at: maestro::core::time::now_rfc3339(),
        },
    )?;
    println!("project '{slug}' scaffolded at {}; delegating ingest of {} to the external pipeline", project_root.display(), path.display());
    Ok(())
}

fn run_tool(op: String, args: Vec<String>) -> Result<(), MaestroError> {
    let runtime = build_runtime(None, None);
    let slug = args.first().cloned().unwrap_or_default();

    let value: serde_json::Value = match op.as_str() {
        "project_context" => serde_json::to_value(maestro::tools::project_context(&runtime, &slug)?)?,
        "get_access_urls" => serde_json::to_value(maestro::tools::get_access_urls(&runtime, &slug)?)?,
        "list_pages" => {
            let discipline = args.get(1).cloned();
            serde_json::to_value(maestro::tools::list_pages(&runtime, &slug, discipline.as_deref())?)?
        }
        "search" => {
            let query = args.get(1).cloned().unwrap_or_default();
            let limit = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
            serde_json::to_value(maestro::tools::search::search(&runtime, &slug, &query, limit)?)?
        }
        "get_sheet_summary" => {
            let page = args.get(1).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::get_sheet_summary(&runtime, &slug, &page)?)?
        }
        "list_workspaces" => serde_json::to_value(maestro::tools::workspaces::list_workspaces(&runtime, &slug)?)?,
        "get_workspace" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::get_workspace(&runtime, &slug, &ws_slug)?)?
        }
        "create_workspace" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let title = args.get(2).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::create_workspace(&runtime, &slug, &ws_slug, &title)?)?
        }
        "add_page" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let page = args.get(2).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::add_page(&runtime, &slug, &ws_slug, &page)?)?
        }
        "remove_page" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let page = args.get(2).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::remove_page(&runtime, &slug, &ws_slug, &page)?)?
        }
        "select_pointers" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let page = args.get(2).cloned().unwrap_or_default();
            let pointer_ids: Vec<String> = args.get(3..).map(|s| s.to_vec()).unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::select_pointers(&runtime, &slug, &ws_slug, &page, &pointer_ids)?)?
        }
        "deselect_pointers" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let page = args.get(2).cloned().unwrap_or_default();
            let pointer_ids: Vec<String> = args.get(3..).map(|s| s.to_vec()).unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::deselect_pointers(&runtime, &slug, &ws_slug, &page, &pointer_ids)?)?
        }
        "add_description" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let page = args.get(2).cloned().unwrap_or_default();
            let description = args.get(3).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::add_description(&runtime, &slug, &ws_slug, &page, &description)?)?
        }
        "set_custom_highlight" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let page = args.get(2).cloned().unwrap_or_default();
            let bbox: maestro::core::model::BBox = args
                .get(3)
                .map(|s| serde_json::from_str(s))
                .transpose()?
                .unwrap_or_default();
            let label = args.get(4).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::set_custom_highlight(&runtime, &slug, &ws_slug, &page, bbox, &label)?)?
        }
        "clear_custom_highlights" => {
            let ws_slug = args.get(1).cloned().unwrap_or_default();
            let page = args.get(2).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::workspaces::clear_custom_highlights(&runtime, &slug, &ws_slug, &page)?)?
        }
        "get_project_notes" => serde_json::to_value(maestro::tools::notes::get_project_notes(&runtime, &slug)?)?,
        "upsert_note_category" => {
            let id = args.get(1).cloned().unwrap_or_default();
            let name = args.get(2).cloned().unwrap_or_default();
            let color: maestro::core::model::CategoryColor = args
                .get(3)
                .map(|s| serde_json::from_value(serde_json::Value::String(s.clone())))
                .transpose()?
                .unwrap_or_default();
            let order = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
            serde_json::to_value(maestro::tools::notes::upsert_note_category(&runtime, &slug, &id, &name, color, order)?)?
        }
        "add_note" => {
            let text = args.get(1).cloned().unwrap_or_default();
            let category_id = args.get(2).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::notes::add_note(&runtime, &slug, &text, &category_id, Vec::new())?)?
        }
        "update_note_state" => {
            let note_id = args.get(1).cloned().unwrap_or_default();
            let status: Option<maestro::core::model::NoteStatus> = args
                .get(2)
                .filter(|s| !s.is_empty())
                .map(|s| serde_json::from_value(serde_json::Value::String(s.clone())))
                .transpose()?;
            let pinned = args.get(3).and_then(|s| s.parse().ok());
            serde_json::to_value(maestro::tools::notes::update_note_state(&runtime, &slug, &note_id, status, pinned)?)?
        }
        "get_schedule_status" => serde_json::to_value(maestro::tools::schedule::get_schedule_status(&runtime, &slug)?)?,
        "get_schedule_timeline" => {
            let month = args.get(1).cloned().unwrap_or_default();
            let include_empty_days = args.get(2).map(|s| s == "true").unwrap_or(false);
            serde_json::to_value(maestro::tools::schedule::get_schedule_timeline(&runtime, &slug, &month, include_empty_days)?)?
        }
        "list_schedule_items" => serde_json::to_value(maestro::tools::schedule::list_schedule_items(&runtime, &slug)?)?,
        "upsert_schedule_item" => {
            let item: maestro::core::model::ScheduleItem = args
                .get(1)
                .map(|s| serde_json::from_str(s))
                .transpose()?
                .unwrap_or_default();
            serde_json::to_value(maestro::tools::schedule::upsert_schedule_item(&runtime, &slug, item)?)?
        }
        "set_schedule_constraint" => {
            let item_id = args.get(1).cloned().unwrap_or_default();
            let impact = args.get(2).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::schedule::set_schedule_constraint(&runtime, &slug, &item_id, &impact)?)?
        }
        "close_schedule_item" => {
            let item_id = args.get(1).cloned().unwrap_or_default();
            let status: maestro::core::model::ScheduleItemStatus = args
                .get(2)
                .map(|s| serde_json::from_value(serde_json::Value::String(s.clone())))
                .transpose()?
                .unwrap_or_default();
            let reason = args.get(3).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::schedule::close_schedule_item(&runtime, &slug, &item_id, status, &reason)?)?
        }
        "list_regions" => {
            let page = args.get(1).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::list_regions(&runtime, &slug, &page)?)?
        }
        "get_region_detail" => {
            let page = args.get(1).cloned().unwrap_or_default();
            let region_id = args.get(2).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::get_region_detail(&runtime, &slug, &page, &region_id)?)?
        }
        "find_cross_references" => {
            let page = args.get(1).cloned().unwrap_or_default();
            serde_json::to_value(maestro::tools::find_cross_references(&runtime, &slug, &page)?)?
        }
        other => return Err(MaestroError::UnsupportedAction(other.to_string())),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
