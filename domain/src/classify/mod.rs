//! Deterministic tier-0 classification (keyword rules over whole tokens)

pub mod rules;
pub mod tokenizer;

pub use rules::{RuleClassification, classify};
pub use tokenizer::{contains_phrase, tokenize};
