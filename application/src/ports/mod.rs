//! Ports: interfaces the application layer consumes or publishes to
//!
//! Implementations (adapters) live in the infrastructure layer.

pub mod event_publisher;
pub mod inference_gateway;
pub mod instance_store;
pub mod memory_gateway;

pub use event_publisher::{CoordinatorEvent, EventPublisher, NoopPublisher, content_digest};
pub use inference_gateway::{GatewayError, InferenceGateway, InferenceRequest};
pub use instance_store::{CollaborationStore, InstanceStore};
pub use memory_gateway::{MemoryGateway, NoMemory};
