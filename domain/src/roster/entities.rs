//! Agent roster entities

use crate::core::backend::BackendId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A role definition from the static catalog (Value Object)
///
/// Catalog entries are loaded at startup and immutable at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRole {
    pub name: String,
    pub capabilities: BTreeSet<String>,
    /// Free text guiding the agent's behavior in collaborations
    pub directive: String,
    /// Which inference backend this role prefers
    pub preferred_backend: BackendId,
}

impl AgentRole {
    pub fn new(
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = impl Into<String>>,
        directive: impl Into<String>,
        preferred_backend: BackendId,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            directive: directive.into(),
            preferred_backend,
        }
    }
}

/// Lifecycle status of an instantiated agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Retired,
}

/// An instantiated agent bound to a session (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInstance {
    pub id: String,
    pub role: String,
    pub session_id: String,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
}

impl AgentInstance {
    /// Instantiate a role for a session with a fresh id.
    pub fn instantiate(role: &AgentRole, session_id: impl Into<String>) -> Self {
        Self {
            id: format!("agent-{}", Uuid::new_v4()),
            role: role.name.clone(),
            session_id: session_id.into(),
            status: AgentStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Take the agent out of rotation once its session is closed.
    pub fn retire(&mut self) {
        self.status = AgentStatus::Retired;
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

/// Outcome of a roster creation call
///
/// An instance appears in `created` only after it has been independently
/// re-read from the store by id; anything else lands in `failed`, never
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterOutcome {
    pub created: Vec<AgentInstance>,
    pub failed: Vec<String>,
}

impl RosterOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Truthful one-line status: a partial success is reported as such,
    /// never as unconditional success.
    pub fn describe(&self) -> String {
        match (self.created.len(), self.failed.len()) {
            (n, 0) => format!("created {n} agents"),
            (0, m) => format!("failed to create {m} agents: {}", self.failed.join(", ")),
            (n, m) => format!(
                "created {n} agents, {m} failed: {}",
                self.failed.join(", ")
            ),
        }
    }
}
