//! Engine tuning parameters
//!
//! Tier timeouts, the gathering cap, memory retrieval settings, and
//! collaboration bounds. Values come from configuration and are validated
//! by clamping rather than rejection, so a bad config file degrades to
//! sane behavior instead of refusing to start.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning parameters for the decision engine, state machine, and
/// collaboration executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Tier-0 rules must reach this confidence to short-circuit the chain
    pub tier0_confidence_threshold: f64,
    /// Tier-1 (local model) deadline in milliseconds
    pub local_timeout_ms: u64,
    /// Tier-2 (remote model) deadline in milliseconds
    pub remote_timeout_ms: u64,
    /// Gathering loop turn cap before forced progression with defaults
    pub max_gathering_turns: u32,
    /// How many memory records to retrieve per turn
    pub memory_k: usize,
    /// Minimum similarity score for retrieved records
    pub memory_min_score: f64,
    /// Collaboration round cap
    pub max_rounds: u32,
    /// Per-agent-call deadline within a collaboration round, milliseconds
    pub round_timeout_ms: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            tier0_confidence_threshold: 0.8,
            local_timeout_ms: 3_000,
            remote_timeout_ms: 5_000,
            max_gathering_turns: 5,
            memory_k: 5,
            memory_min_score: 0.5,
            max_rounds: 8,
            round_timeout_ms: 10_000,
        }
    }
}

impl EngineParams {
    pub fn local_timeout(&self) -> Duration {
        Duration::from_millis(self.local_timeout_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    /// Upper bound on one classification: the tier deadlines summed.
    /// Tier 0 and tier 3 are synchronous and contribute only the small
    /// constant the caller allows for.
    pub fn total_deadline(&self) -> Duration {
        self.local_timeout() + self.remote_timeout()
    }

    /// Clamp out-of-range values into working ranges.
    pub fn sanitized(mut self) -> Self {
        self.tier0_confidence_threshold = self.tier0_confidence_threshold.clamp(0.0, 1.0);
        self.memory_min_score = self.memory_min_score.clamp(0.0, 1.0);
        self.max_gathering_turns = self.max_gathering_turns.max(1);
        self.max_rounds = self.max_rounds.max(1);
        self
    }
}
