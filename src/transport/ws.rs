//! WebSocket live-update endpoints (`spec.md` §4.G).
//!
//! Each connection gets an `init` frame carrying a snapshot, then streams
//! typed events from the bus as plain JSON frames. Events for other
//! projects are filtered out of the per-project socket; the command-center
//! socket sees everything.

use crate::core::runtime::Runtime;
use crate::events::Event;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path as AxPath, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::json;

pub fn routes() -> Router<Runtime> {
    Router::new()
        .route("/{slug}/ws", get(project_ws))
        .route("/ws/command-center", get(command_center_ws))
}

async fn project_ws(
    State(runtime): State<Runtime>,
    AxPath(slug): AxPath<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_project_socket(socket, runtime, slug))
}

async fn command_center_ws(State(runtime): State<Runtime>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| handle_command_center_socket(socket, runtime))
}

async fn handle_project_socket(mut socket: WebSocket, runtime: Runtime, slug: String) {
    let init = json!({ "type": "init", "project_slug": slug });
    if socket.send(Message::Text(init.to_string().into())).await.is_err() {
        return;
    }

    let mut subscription = runtime.event_bus.subscribe();
    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Some(event) if event_concerns_project(&event, &slug) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Some(_) => continue,
                    None => break,
                }
            }
            incoming = socket.recv() => {
                if incoming.is_none() {
                    break;
                }
            }
        }
    }
}

async fn handle_command_center_socket(mut socket: WebSocket, runtime: Runtime) {
    let snapshot = runtime.aggregator.snapshot().ok();
    let init = json!({ "type": "init", "snapshot": snapshot });
    if socket.send(Message::Text(init.to_string().into())).await.is_err() {
        return;
    }

    let mut subscription = runtime.event_bus.subscribe();
    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                if incoming.is_none() {
                    break;
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &Event) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(payload.into())).await
}

fn event_concerns_project(event: &Event, slug: &str) -> bool {
    match event {
        Event::ProjectAdded { slug: s } | Event::ProjectRemoved { slug: s } => s == slug,
        Event::PageAdded { project_slug, .. }
        | Event::PageUpdated { project_slug, .. }
        | Event::PageImageReady { project_slug, .. }
        | Event::RegionComplete { project_slug, .. }
        | Event::WorkspaceUpdated { project_slug, .. }
        | Event::ScheduleUpdated { project_slug }
        | Event::NotesUpdated { project_slug }
        | Event::HeartbeatUpdated { project_slug } => project_slug == slug,
        Event::DirectiveChanged { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_concerns_project_filters_by_slug() {
        assert!(event_concerns_project(&Event::ScheduleUpdated { project_slug: "alpha".into() }, "alpha"));
        assert!(!event_concerns_project(&Event::ScheduleUpdated { project_slug: "beta".into() }, "alpha"));
        assert!(!event_concerns_project(&Event::DirectiveChanged { directive_id: "d1".into() }, "alpha"));
    }
}
