//! Static role catalog
//!
//! The built-in roles cover a default project team; configuration can add
//! or replace entries at startup. The catalog is read-mostly and safe to
//! share across sessions.

use super::entities::AgentRole;
use crate::core::backend::BackendId;
use std::collections::BTreeMap;

/// Catalog of agent role definitions, keyed by role name
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: BTreeMap<String, AgentRole>,
}

impl RoleCatalog {
    /// The built-in default team
    pub fn builtin() -> Self {
        let mut catalog = Self {
            roles: BTreeMap::new(),
        };
        catalog.register(AgentRole::new(
            "architect",
            ["design", "tradeoffs", "estimation"],
            "Shape the technical approach. State structure, boundaries, and the first \
             milestone. Flag dependencies on OBJECTIVE before tasks are planned.",
            BackendId::Remote,
        ));
        catalog.register(AgentRole::new(
            "developer",
            ["code", "estimation"],
            "Break the objective into concrete tasks with owners and estimates. \
             Contribute TASK lines.",
            BackendId::Local,
        ));
        catalog.register(AgentRole::new(
            "tester",
            ["testing", "risk-analysis"],
            "Name the risks and the acceptance criteria that would prove the sprint done. \
             Contribute RISK and ACCEPTANCE lines.",
            BackendId::Local,
        ));
        catalog.register(AgentRole::new(
            "project_manager",
            ["planning", "moderation"],
            "Keep the plan coherent. Restate the OBJECTIVE, fill gaps other roles left, \
             and say STOP once every section of the plan is covered.",
            BackendId::Remote,
        ));
        catalog
    }

    /// Add or replace a role definition. Used at startup only.
    pub fn register(&mut self, role: AgentRole) {
        self.roles.insert(role.name.clone(), role);
    }

    pub fn get(&self, name: &str) -> Option<&AgentRole> {
        self.roles.get(name)
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
