//! Command Center awareness aggregator (`spec.md` §4.I).
//!
//! Rebuilds an in-memory snapshot from the registry, heartbeats, the
//! knowledge loader, and the directive store. The snapshot is cached for
//! one second to coalesce request bursts from the command-center UI and
//! invalidated immediately on any heartbeat, directive, or registry
//! change — the cache is a latency optimization, never a second source
//! of truth.

use crate::core::loader;
use crate::core::model::{AgentRole, FleetAgent, LoopState};
use crate::core::path_resolver::{self as paths};
use crate::fleet::directives::DirectiveStore;
use crate::fleet::heartbeat;
use crate::fleet::registry::Registry;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const CACHE_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    Healthy,
    Degraded,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub agent_id: String,
    pub display_name: String,
    pub loop_state: LoopState,
    pub is_fresh: bool,
    pub summary: String,
    pub last_message_at: String,
    pub metrics: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AwarenessSnapshot {
    pub store_root: String,
    pub posture: Posture,
    pub agents: Vec<FleetAgent>,
    pub nodes: Vec<NodeStatus>,
    pub directive_count: usize,
    pub knowledge_summary: std::collections::HashMap<String, usize>,
}

/// Thin cache wrapper over the stateless computation in this module.
pub struct Aggregator {
    fleet_root: PathBuf,
    heartbeat_ttl_seconds: u64,
    cached: Mutex<Option<(Instant, AwarenessSnapshot)>>,
}

impl Aggregator {
    pub fn new(fleet_root: PathBuf, heartbeat_ttl_seconds: u64) -> Self {
        Aggregator {
            fleet_root,
            heartbeat_ttl_seconds,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached snapshot if fresh, otherwise rebuild.
    pub fn snapshot(&self) -> crate::core::error::Result<AwarenessSnapshot> {
        {
            let guard = self.cached.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((built_at, snapshot)) = guard.as_ref() {
                if built_at.elapsed() < CACHE_TTL {
                    return Ok(snapshot.clone());
                }
            }
        }
        let snapshot = self.build()?;
        let mut guard = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }

    /// Drop the cached snapshot; called on `HeartbeatUpdated`,
    /// `DirectiveChanged`, and any registry mutation.
    pub fn invalidate(&self) {
        let mut guard = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    fn build(&self) -> crate::core::error::Result<AwarenessSnapshot> {
        let registry = Registry::new(&self.fleet_root);
        let agents = registry.list()?;
        let directives = DirectiveStore::new(&self.fleet_root).list(false)?;

        let mut nodes = Vec::new();
        for agent in agents.iter().filter(|a| a.role == Some(AgentRole::Project) && !a.archived) {
            nodes.push(node_status_for(&self.fleet_root, agent, self.heartbeat_ttl_seconds));
        }

        let mut knowledge_summary = std::collections::HashMap::new();
        if let Ok(projects) = loader::list_projects(&self.fleet_root) {
            knowledge_summary.insert("project_count".to_string(), projects.len());
        }

        let posture = if agents.iter().any(|a| a.role == Some(AgentRole::Commander) && !a.archived) {
            if nodes.iter().all(|n| n.is_fresh) || nodes.is_empty() {
                Posture::Healthy
            } else {
                Posture::Degraded
            }
        } else {
            Posture::Offline
        };

        Ok(AwarenessSnapshot {
            store_root: self.fleet_root.display().to_string(),
            posture,
            agents,
            nodes,
            directive_count: directives.len(),
            knowledge_summary,
        })
    }
}

/// Per-node status derived from (1) a fresh heartbeat or (2) the stale
/// fallback (`spec.md` §4.I).
pub fn node_status_for(fleet_root: &std::path::Path, agent: &FleetAgent, ttl_seconds: u64) -> NodeStatus {
    let project_root = paths::project_root(fleet_root, &agent.project_slug)
        .unwrap_or_else(|_| fleet_root.join(&agent.project_slug));
    let hb = heartbeat::load(&project_root).unwrap_or_default();
    let fresh = heartbeat::is_fresh(&hb, ttl_seconds);

    let (loop_state, summary) = if fresh {
        (hb.loop_state, hb.summary.clone())
    } else {
        heartbeat::stale_fallback_summary(&hb)
    };

    NodeStatus {
        agent_id: agent.agent_id.clone(),
        display_name: agent.display_name.clone(),
        loop_state,
        is_fresh: fresh,
        summary,
        last_message_at: hb.updated_at,
        metrics: hb.metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Heartbeat;

    #[test]
    fn snapshot_offline_without_commander() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path());
        registry.register("agent-a", "alpha", "Agent A", AgentRole::Project).unwrap();
        let aggregator = Aggregator::new(dir.path().to_path_buf(), 90);
        let snapshot = aggregator.snapshot().unwrap();
        assert_eq!(snapshot.posture, Posture::Offline);
    }

    #[test]
    fn node_status_reports_stale_summary_past_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let project_root = dir.path().join("alpha");
        let old = chrono::Utc::now() - chrono::Duration::seconds(200);
        // write the stale heartbeat directly; `record()` would stamp `now`.
        crate::core::atomic_store::write_json(
            &crate::core::path_resolver::heartbeat_path(&project_root),
            &Heartbeat { updated_at: old.to_rfc3339(), ..Default::default() },
        )
        .unwrap();

        let agent = FleetAgent {
            agent_id: "agent-a".into(),
            project_slug: "alpha".into(),
            display_name: "Agent A".into(),
            role: Some(AgentRole::Project),
            registered_at: String::new(),
            archived: false,
        };
        let status = node_status_for(dir.path(), &agent, 90);
        assert!(!status.is_fresh);
        assert!(status.summary.contains("stale"));
    }
}
