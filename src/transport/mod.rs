//! HTTP + WebSocket live transport (`spec.md` §4.G).
//!
//! Built on `axum` and `tower-http`, sourced from the broader example pack
//! rather than the teacher (which has no web stack) — see `DESIGN.md`.

pub mod http;
pub mod ws;

use crate::core::runtime::Runtime;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full Axum router: workspace UI + command-center JSON API +
/// WebSocket endpoints, all sharing one `Runtime` via `with_state`.
pub fn build_router(runtime: Runtime) -> Router {
    Router::new()
        .merge(http::routes())
        .merge(ws::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(runtime)
}
