//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Only [`DomainError::InvariantViolation`] is allowed to cross component
/// boundaries as a hard error. Everything else the coordinator turns into a
/// typed outcome the caller can render (fallback decision, partial roster
/// result, incomplete collaboration).
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl DomainError {
    /// Check if this error represents a broken invariant (programming error)
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, DomainError::InvariantViolation(_))
    }
}
