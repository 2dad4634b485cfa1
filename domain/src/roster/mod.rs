//! Agent roles, instances, and the static role catalog

pub mod catalog;
pub mod entities;

pub use catalog::RoleCatalog;
pub use entities::{AgentInstance, AgentRole, AgentStatus, RosterOutcome};
