//! Session state: PDCA phases, slots, turns, and pending-decision intent

pub mod entities;
pub mod intent;
pub mod phase;
pub mod repository;
pub mod slots;

pub use entities::{Session, Turn, TurnAction};
pub use intent::{TurnIntent, match_intent};
pub use phase::PdcaPhase;
pub use repository::SessionRepository;
pub use slots::SlotValue;
