//! Bounded multi-agent collaboration: transcripts, termination, deliverables

pub mod deliverable;
pub mod entities;

pub use deliverable::{Deliverable, PlannedTask, contains_stop, parse_needs};
pub use entities::{CollaborationSession, Termination, TranscriptEntry};
