//! Event publishing adapters

mod broadcast;

pub use broadcast::BroadcastEventPublisher;
