//! Stores for agent instances and collaboration transcripts

use async_trait::async_trait;
use foreman_domain::{AgentInstance, CollaborationSession, DomainError};

/// Durable store for agent instances, keyed by id
///
/// The roster's verification read-after-write runs against this store: an
/// instance counts as created only once `get` returns it independently of
/// the `put` that wrote it.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn put(&self, instance: AgentInstance) -> Result<(), DomainError>;

    async fn get(&self, id: &str) -> Result<Option<AgentInstance>, DomainError>;

    async fn list_for_session(&self, session_id: &str) -> Result<Vec<AgentInstance>, DomainError>;
}

/// Durable store for collaboration sessions (transcript included)
#[async_trait]
pub trait CollaborationStore: Send + Sync {
    async fn save(&self, session: &CollaborationSession) -> Result<(), DomainError>;

    async fn load(&self, id: &str) -> Result<Option<CollaborationSession>, DomainError>;
}
