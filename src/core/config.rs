//! Layered runtime configuration (`SPEC_FULL.md` §6).
//!
//! Precedence, lowest to highest: hard-coded defaults, install-state file,
//! environment variables, CLI flags. Each layer only overrides fields the
//! layer above it actually set — this mirrors the teacher's `Store`
//! root-resolution layering (`core::store`), generalized from "find the
//! data directory" to a full config struct.

use crate::core::path_resolver::InstallState;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 4175;
const DEFAULT_HEARTBEAT_TTL_SECONDS: u64 = 90;
const DEFAULT_EVENT_QUEUE_DEPTH: usize = 256;

fn default_install_state_path() -> PathBuf {
    dirs_home().join(".maestro-solo").join("install.json")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Fully-resolved runtime configuration, threaded into the `Runtime`
/// context (§4.L) rather than read ad hoc from the environment.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub store_root: PathBuf,
    pub active_project_slug: Option<String>,
    pub heartbeat_ttl_seconds: u64,
    pub event_queue_depth: usize,
    pub port: u16,
    pub capability_token: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            store_root: PathBuf::from("."),
            active_project_slug: None,
            heartbeat_ttl_seconds: DEFAULT_HEARTBEAT_TTL_SECONDS,
            event_queue_depth: DEFAULT_EVENT_QUEUE_DEPTH,
            port: DEFAULT_PORT,
            capability_token: None,
        }
    }
}

/// CLI-level overrides, populated directly from clap flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub store_root: Option<PathBuf>,
    pub port: Option<u16>,
}

impl RuntimeConfig {
    /// Build the layered config: defaults, then install-state, then
    /// environment, then CLI flags.
    pub fn resolve(overrides: CliOverrides) -> Self {
        let mut config = RuntimeConfig::default();

        if let Ok(contents) = std::fs::read_to_string(default_install_state_path()) {
            if let Ok(state) = serde_json::from_str::<InstallState>(&contents) {
                if let Some(root) = &state.store_root {
                    config.store_root = PathBuf::from(root);
                }
                config.active_project_slug = state.active_project_slug;
            }
        }

        if let Ok(store) = std::env::var("MAESTRO_STORE") {
            config.store_root = PathBuf::from(store);
        }
        if let Ok(slug) = std::env::var("MAESTRO_ACTIVE_PROJECT_SLUG") {
            config.active_project_slug = Some(slug);
        }
        if let Ok(ttl) = std::env::var("MAESTRO_HEARTBEAT_TTL_SECONDS") {
            if let Ok(parsed) = ttl.parse() {
                config.heartbeat_ttl_seconds = parsed;
            }
        }
        if let Ok(depth) = std::env::var("MAESTRO_EVENT_QUEUE_DEPTH") {
            if let Ok(parsed) = depth.parse() {
                config.event_queue_depth = parsed;
            }
        }

        if let Some(root) = overrides.store_root {
            config.store_root = root;
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_layer() {
        let config = RuntimeConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.heartbeat_ttl_seconds, DEFAULT_HEARTBEAT_TTL_SECONDS);
    }

    #[test]
    fn cli_override_wins_over_default() {
        let config = RuntimeConfig::resolve(CliOverrides {
            store_root: Some(PathBuf::from("/tmp/explicit-store")),
            port: Some(9999),
        });
        assert_eq!(config.store_root, PathBuf::from("/tmp/explicit-store"));
        assert_eq!(config.port, 9999);
    }
}
