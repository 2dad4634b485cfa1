//! Inference backend adapters

mod http_gateway;

pub use http_gateway::{BackendEndpoint, HttpInferenceGateway};
