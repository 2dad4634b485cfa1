//! Core domain primitives shared across modules

pub mod backend;
pub mod error;

pub use backend::BackendId;
pub use error::DomainError;
