//! Intent matching against a pending decision
//!
//! When a turn arrives while a decision is awaiting follow-up (e.g. a
//! proposed plan), the user's reply is matched against that pending
//! decision instead of being re-classified from a blank slate. This is
//! what makes "yes, create the team" act on the proposal rather than
//! looping back to the same template.

use crate::classify::tokenize;

const AFFIRM_TOKENS: &[&str] = &[
    "yes", "yeah", "yep", "sure", "ok", "okay", "confirm", "confirmed", "proceed", "approve",
    "approved", "go", "create",
];

const REJECT_TOKENS: &[&str] = &[
    "no", "nope", "dont", "don", "cancel", "stop", "reject", "change", "not",
];

/// The user's stance toward the pending decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnIntent {
    /// Explicit agreement; the pending decision may be applied
    Affirm,
    /// Explicit refusal; the pending decision is dropped
    Reject,
    /// Neither; the turn is classified as new input
    Other,
}

/// Match a turn against the pending decision using whole-token vocabularies.
/// Rejection tokens win over affirmation tokens, so "no, don't create it
/// yet" never reads as consent.
pub fn match_intent(turn_text: &str) -> TurnIntent {
    let tokens = tokenize(turn_text);
    if tokens.iter().any(|t| REJECT_TOKENS.contains(&t.as_str())) {
        return TurnIntent::Reject;
    }
    if tokens.iter().any(|t| AFFIRM_TOKENS.contains(&t.as_str())) {
        return TurnIntent::Affirm;
    }
    TurnIntent::Other
}
