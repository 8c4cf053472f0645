//! Fleet agent registry (`spec.md` §4.H).
//!
//! Writes go through `core::atomic_store`, same as any other document.
//! Exactly one `commander` may exist at a time; registering a second one
//! is a `Conflict`, not silently overwritten.

use crate::core::atomic_store::{default_deadline, update_json};
use crate::core::error::{MaestroError, Result};
use crate::core::model::{AgentRole, FleetAgent, FleetRegistryDoc};
use crate::core::path_resolver::fleet_registry_path;
use crate::core::time::now_rfc3339;
use std::path::{Path, PathBuf};

/// Thin handle over the on-disk registry file — stateless beyond the path,
/// safe to clone and share across handlers via `Runtime`.
#[derive(Clone)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    pub fn new(fleet_root: &Path) -> Self {
        Registry { path: fleet_registry_path(fleet_root) }
    }

    pub fn register(
        &self,
        agent_id: &str,
        project_slug: &str,
        display_name: &str,
        role: AgentRole,
    ) -> Result<FleetAgent> {
        update_json::<FleetRegistryDoc, _, _>(&self.path, default_deadline(), |doc| {
            if role == AgentRole::Commander {
                let existing_commander = doc
                    .agents
                    .iter()
                    .find(|a| !a.archived && a.role == Some(AgentRole::Commander));
                if existing_commander.is_some() {
                    return Err(MaestroError::Conflict(
                        "a commander is already registered".to_string(),
                    ));
                }
            }
            if let Some(existing) = doc.agents.iter_mut().find(|a| a.agent_id == agent_id) {
                existing.archived = false;
                existing.project_slug = project_slug.to_string();
                existing.display_name = display_name.to_string();
                existing.role = Some(role);
                return Ok(existing.clone());
            }
            let agent = FleetAgent {
                agent_id: agent_id.to_string(),
                project_slug: project_slug.to_string(),
                display_name: display_name.to_string(),
                role: Some(role),
                registered_at: now_rfc3339(),
                archived: false,
            };
            doc.agents.push(agent.clone());
            Ok(agent)
        })
    }

    pub fn archive(&self, agent_id: &str) -> Result<FleetAgent> {
        update_json::<FleetRegistryDoc, _, _>(&self.path, default_deadline(), |doc| {
            let agent = doc
                .agents
                .iter_mut()
                .find(|a| a.agent_id == agent_id)
                .ok_or_else(|| MaestroError::NotFound(format!("agent '{agent_id}' not registered")))?;
            agent.archived = true;
            Ok(agent.clone())
        })
    }

    pub fn list(&self) -> Result<Vec<FleetAgent>> {
        let doc: FleetRegistryDoc = crate::core::atomic_store::read_typed(&self.path)?;
        Ok(doc.agents)
    }

    pub fn find(&self, agent_id: &str) -> Result<Option<FleetAgent>> {
        Ok(self.list()?.into_iter().find(|a| a.agent_id == agent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_commander_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path());
        registry.register("cmd-1", "", "Commander", AgentRole::Commander).unwrap();
        let err = registry
            .register("cmd-2", "", "Another Commander", AgentRole::Commander)
            .unwrap_err();
        assert_eq!(err.kind(), "Conflict");
    }

    #[test]
    fn archive_then_find_reflects_state() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path());
        registry.register("agent-a", "alpha", "Agent A", AgentRole::Project).unwrap();
        registry.archive("agent-a").unwrap();
        let found = registry.find("agent-a").unwrap().unwrap();
        assert!(found.archived);
    }

    #[test]
    fn re_registering_same_agent_updates_fields() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path());
        registry.register("agent-a", "alpha", "Agent A", AgentRole::Project).unwrap();
        registry.register("agent-a", "alpha", "Renamed", AgentRole::Project).unwrap();
        let agents = registry.list().unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].display_name, "Renamed");
    }
}
