//! Inference gateway port
//!
//! Defines the interface for running completions against text-generation
//! backends. At least two independently-failing backends are expected
//! (local and remote); each carries its own latency profile.

use async_trait::async_trait;
use foreman_domain::BackendId;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during inference gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Deadline exceeded")]
    Timeout,

    #[error("Reply did not match the requested schema: {0}")]
    SchemaInvalid(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

/// One completion request
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub backend: BackendId,
    pub system_prompt: String,
    pub prompt: String,
    /// Deadline the adapter must honor; callers additionally enforce it
    /// with their own timer so a misbehaving adapter cannot stall a tier.
    pub deadline: Duration,
}

impl InferenceRequest {
    pub fn new(
        backend: BackendId,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
        deadline: Duration,
    ) -> Self {
        Self {
            backend,
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            deadline,
        }
    }
}

/// Gateway for text-generation backends
///
/// Implementations (adapters) live in the infrastructure layer. All calls
/// are read-only from the caller's perspective: the gateway has no
/// visible side effects on coordinator state.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Run a completion and return the raw reply text.
    async fn complete_text(&self, request: InferenceRequest) -> Result<String, GatewayError>;

    /// Run a completion whose reply must contain a JSON object. The
    /// adapter extracts and parses it; a reply without one fails with
    /// [`GatewayError::SchemaInvalid`]. Typed decoding happens at the
    /// call site.
    async fn complete_structured(
        &self,
        request: InferenceRequest,
    ) -> Result<serde_json::Value, GatewayError>;
}
