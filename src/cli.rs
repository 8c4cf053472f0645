//! CLI struct definitions for the Maestro runtime binary.
//!
//! All clap-derived types live here. Dispatch logic lives in `main.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "maestro",
    version = env!("CARGO_PKG_VERSION"),
    about = "Maestro is the runtime core for a construction-plan knowledge store: it serves the workspace UI, the command center, and the agent tool surface over one store root.",
    disable_version_flag = true
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP/WebSocket transport (workspace UI + command center).
    Serve(ServeCli),
    /// Serve plus bring up the local TUI dashboard.
    Up(UpCli),
    /// Check store health and optionally repair recoverable issues.
    Doctor(DoctorCli),
    /// Ingest a source path into a project store.
    Ingest(IngestCli),
    /// Invoke a single named tool-surface operation.
    Tools(ToolsCli),
}

#[derive(clap::Args, Debug)]
pub struct ServeCli {
    /// Port to bind the HTTP/WebSocket transport to.
    #[clap(long)]
    pub port: Option<u16>,
    /// Store root override (defaults to install-state / MAESTRO_STORE).
    #[clap(long)]
    pub store: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct UpCli {
    /// Also launch the local TUI dashboard alongside the server.
    #[clap(long)]
    pub tui: bool,
    #[clap(long)]
    pub port: Option<u16>,
}

#[derive(clap::Args, Debug)]
pub struct DoctorCli {
    /// Attempt to repair recoverable issues (missing directories, stale locks).
    #[clap(long)]
    pub fix: bool,
    /// Emit the report as JSON instead of text.
    #[clap(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct IngestCli {
    /// Path to ingest (a directory of source sheets/drawings).
    pub path: PathBuf,
    /// Project display name; a slug is derived from it if the project is new.
    #[clap(long)]
    pub project_name: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ToolsCli {
    /// Tool-surface operation name, e.g. `search`, `list_pages`.
    pub op: String,
    /// Positional arguments forwarded to the operation.
    pub args: Vec<String>,
}
