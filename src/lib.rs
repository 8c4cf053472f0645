//! Maestro: runtime core for a construction-plan knowledge store.
//!
//! A separate ingest pipeline turns plan-set PDFs into a structured
//! on-disk knowledge store (JSON documents plus rendered images); this
//! crate is the runtime that serves that store to conversational agents,
//! a browser workspace, and a fleet-level Command Center. It does not
//! decode PDFs, run vision models, render images, or implement the
//! installer/billing/license surfaces around it — see `SPEC_FULL.md` for
//! the full boundary.
//!
//! # Architecture
//!
//! - `core`: on-disk document shapes, the atomic JSON store, path
//!   resolution, and the `Runtime` context every handler is built around.
//! - `tools`: the named, typed tool surface (`core::project_context`,
//!   `search`, workspace/notes/schedule operations, ...).
//! - `events`: the typed pub/sub event bus and the filesystem watcher that
//!   feeds it.
//! - `fleet`: the Command Center — agent registry, heartbeat freshness,
//!   the awareness aggregator, directives, and the action dispatcher.
//! - `transport`: the Axum HTTP + WebSocket surface.
//!
//! # Shared-resource policy
//!
//! The event bus, the aggregator cache, and the fleet registry are the
//! only process-wide mutable structures; each is independently locked.
//! The filesystem is the source of truth everywhere else.

pub mod cli;
pub mod core;
pub mod doctor;
pub mod events;
pub mod fleet;
pub mod tools;
pub mod transport;

pub use core::error::{MaestroError, Result};
pub use core::runtime::Runtime;
