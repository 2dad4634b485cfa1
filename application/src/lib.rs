//! Application layer for foreman
//!
//! This crate contains use cases, port definitions, and engine
//! configuration. It depends only on the domain layer; adapters for its
//! ports live in the infrastructure layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::EngineParams;
pub use ports::{
    event_publisher::{CoordinatorEvent, EventPublisher, NoopPublisher},
    inference_gateway::{GatewayError, InferenceGateway, InferenceRequest},
    instance_store::{CollaborationStore, InstanceStore},
    memory_gateway::{MemoryGateway, NoMemory},
};
pub use use_cases::{
    Classification, ClassifyTurnUseCase, CoordinatorService, CreateAgentsUseCase, DecisionView,
    RunCollaborationError, RunCollaborationUseCase, SessionView, SubmitTurnError,
    SubmitTurnUseCase, TurnOutcome,
};
