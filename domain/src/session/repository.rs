//! Session repository trait

use super::entities::Session;
use crate::core::error::DomainError;
use async_trait::async_trait;

/// Repository for durable session state, keyed by id
///
/// This is a domain-level abstraction; implementations live in the
/// infrastructure layer. The exact storage technology is an external
/// concern.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Load a session by id, `None` if it has never been saved
    async fn load(&self, id: &str) -> Result<Option<Session>, DomainError>;

    /// Persist the full session state
    async fn save(&self, session: &Session) -> Result<(), DomainError>;

    /// Ids of all stored sessions
    async fn list_ids(&self) -> Result<Vec<String>, DomainError>;
}
