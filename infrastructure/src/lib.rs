//! Infrastructure layer for foreman
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: HTTP inference backends, the similarity memory
//! store, JSONL state persistence, event fan-out, and configuration file
//! loading.

pub mod config;
pub mod events;
pub mod inference;
pub mod memory;
pub mod persistence;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use events::BroadcastEventPublisher;
pub use inference::{BackendEndpoint, HttpInferenceGateway};
pub use memory::{MemoryEntry, TokenOverlapMemoryStore};
pub use persistence::JsonlStateStore;
