//! Create Agents use case: the agent roster
//!
//! Creation is synchronous and verified. After writing an instance, the
//! roster re-reads it by id from the store; only independently retrievable
//! instances are reported as created. Anything else lands in `failed`,
//! never silently dropped. This closes the defect class where creation was
//! reported but never persisted.

use crate::ports::event_publisher::{CoordinatorEvent, EventPublisher};
use crate::ports::instance_store::InstanceStore;
use foreman_domain::{AgentInstance, DomainError, RoleCatalog, RosterOutcome};
use std::sync::Arc;
use tracing::{info, warn};

pub struct CreateAgentsUseCase {
    catalog: Arc<RoleCatalog>,
    store: Arc<dyn InstanceStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl CreateAgentsUseCase {
    pub fn new(
        catalog: Arc<RoleCatalog>,
        store: Arc<dyn InstanceStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            catalog,
            store,
            publisher,
        }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Create one instance per requested role for the session. Unknown
    /// roles, write failures, and verification failures all end up in
    /// `failed` with the role name.
    pub async fn execute(&self, session_id: &str, roles: &[String]) -> RosterOutcome {
        let mut created = Vec::new();
        let mut failed = Vec::new();

        for role_name in roles {
            let Some(role) = self.catalog.get(role_name) else {
                warn!(role = %role_name, "unknown role requested");
                failed.push(role_name.clone());
                continue;
            };

            let instance = AgentInstance::instantiate(role, session_id);
            let id = instance.id.clone();

            if let Err(e) = self.store.put(instance).await {
                warn!(role = %role_name, "instance write failed: {e}");
                failed.push(role_name.clone());
                continue;
            }

            // Verification read-after-write: not created until retrievable.
            match self.store.get(&id).await {
                Ok(Some(stored)) => created.push(stored),
                Ok(None) => {
                    warn!(role = %role_name, id = %id, "instance not retrievable after write");
                    failed.push(role_name.clone());
                }
                Err(e) => {
                    warn!(role = %role_name, id = %id, "verification read failed: {e}");
                    failed.push(role_name.clone());
                }
            }
        }

        let outcome = RosterOutcome { created, failed };
        info!(session = %session_id, "{}", outcome.describe());

        self.publisher.publish(CoordinatorEvent::AgentsCreated {
            session_id: session_id.to_string(),
            created: outcome.created.iter().map(|a| a.id.clone()).collect(),
            failed: outcome.failed.clone(),
        });

        outcome
    }

    /// Retire every active instance bound to the session. Retired agents
    /// no longer participate in collaborations.
    pub async fn retire_session(&self, session_id: &str) -> Result<usize, DomainError> {
        let mut retired = 0;
        for mut instance in self.store.list_for_session(session_id).await? {
            if instance.is_active() {
                instance.retire();
                self.store.put(instance).await?;
                retired += 1;
            }
        }
        info!(session = %session_id, retired, "roster retired");
        Ok(retired)
    }
}
