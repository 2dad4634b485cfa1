//! Memory store adapters

mod token_overlap;

pub use token_overlap::{MemoryEntry, TokenOverlapMemoryStore};
