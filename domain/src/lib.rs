//! Domain layer for foreman
//!
//! This crate contains the coordination core's entities, value objects,
//! and pure logic. It has no dependencies on infrastructure or
//! presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tiered decisions
//!
//! Every user turn is classified into a [`Decision`] by an ordered
//! fallback chain: deterministic rules, local model, remote model, safe
//! default. The decision records which tier produced it.
//!
//! ## PDCA sessions
//!
//! A [`Session`] moves through Plan-Do-Check-Act, gathering requirement
//! slots in the plan phase and holding a pending decision that the next
//! turn's intent is matched against.
//!
//! ## Bounded collaboration
//!
//! A [`CollaborationSession`] runs role-specialized agents through a
//! moderated, round-capped conversation toward a structured
//! [`Deliverable`] with a deterministic completion predicate.

pub mod classify;
pub mod collaboration;
pub mod core;
pub mod decision;
pub mod memory;
pub mod roster;
pub mod session;

// Re-export commonly used types
pub use classify::{RuleClassification, tokenize};
pub use collaboration::{
    CollaborationSession, Deliverable, PlannedTask, Termination, TranscriptEntry,
};
pub use core::{BackendId, DomainError};
pub use decision::{Decision, DecisionKind, DecisionTier};
pub use memory::{MemoryDigest, MemoryKind, MemoryRecord};
pub use roster::{AgentInstance, AgentRole, AgentStatus, RoleCatalog, RosterOutcome};
pub use session::{
    PdcaPhase, Session, SessionRepository, SlotValue, Turn, TurnAction, TurnIntent, match_intent,
};
