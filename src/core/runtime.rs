//! The `Runtime` context (`spec.md` §4.L).
//!
//! Constructed once at start-up and threaded into every HTTP handler and
//! every tool-surface invocation. Beyond the event bus and the aggregator
//! cache — each independently locked — there is no other mutable
//! process-wide state; this is the generalization of the teacher's
//! "no monkey-patchable globals" principle to a richer domain.

use crate::core::config::RuntimeConfig;
use crate::events::EventBus;
use crate::fleet::aggregator::Aggregator;
use crate::fleet::registry::Registry;
use std::sync::Arc;

/// Cheap to clone: everything inside is already `Arc`-backed or `Copy`.
#[derive(Clone)]
pub struct Runtime {
    pub config: Arc<RuntimeConfig>,
    pub event_bus: EventBus,
    pub registry: Registry,
    pub aggregator: Arc<Aggregator>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        let event_bus = EventBus::new(config.event_queue_depth);
        let registry = Registry::new(&config.store_root);
        let aggregator = Arc::new(Aggregator::new(config.store_root.clone(), config.heartbeat_ttl_seconds));
        Runtime {
            config: Arc::new(config),
            event_bus,
            registry,
            aggregator,
        }
    }

    /// Validate the capability token once at start-up (`spec.md` §9,
    /// decorator-driven gating rewrite). Tool-surface and HTTP handlers
    /// assume a valid token thereafter; they do not re-check it per call.
    pub fn validate_capability_token(&self, expected: Option<&str>) -> crate::core::error::Result<()> {
        match (expected, &self.config.capability_token) {
            (None, _) => Ok(()),
            (Some(required), Some(actual)) if required == actual => Ok(()),
            _ => Err(crate::core::error::MaestroError::Forbidden(
                "invalid or missing capability token".to_string(),
            )),
        }
    }

    #[cfg(test)]
    pub fn for_test(store_root: &std::path::Path) -> Self {
        Runtime::new(RuntimeConfig {
            store_root: store_root.to_path_buf(),
            ..RuntimeConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_token_mismatch_is_forbidden() {
        let mut config = RuntimeConfig::default();
        config.capability_token = Some("secret".to_string());
        let runtime = Runtime::new(config);
        let err = runtime.validate_capability_token(Some("wrong")).unwrap_err();
        assert_eq!(err.kind(), "Forbidden");
    }

    #[test]
    fn no_token_required_passes() {
        let runtime = Runtime::new(RuntimeConfig::default());
        assert!(runtime.validate_capability_token(None).is_ok());
    }
}
