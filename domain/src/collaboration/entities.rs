//! Collaboration session entities

use super::deliverable::Deliverable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a collaboration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The deliverable's required fields are all populated
    GoalMet,
    /// The round cap was reached with the goal unmet
    RoundCap,
    /// No progress was possible (every remaining speaker blocked)
    Deadlock,
    /// A participant emitted the stop token
    ExplicitStop,
}

impl Termination {
    pub fn as_str(&self) -> &str {
        match self {
            Termination::GoalMet => "goal_met",
            Termination::RoundCap => "round_cap",
            Termination::Deadlock => "deadlock",
            Termination::ExplicitStop => "explicit_stop",
        }
    }

    /// Round-cap and deadlock endings are reported as distinct, non-silent
    /// failure modes, never presented as success.
    pub fn is_success(&self) -> bool {
        matches!(self, Termination::GoalMet)
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the collaboration transcript. A skipped turn (agent call
/// exceeded its deadline) is recorded too, with `skipped` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub agent_id: String,
    pub content: String,
    pub round: u32,
    #[serde(default)]
    pub skipped: bool,
}

impl TranscriptEntry {
    pub fn spoken(agent_id: impl Into<String>, content: impl Into<String>, round: u32) -> Self {
        Self {
            agent_id: agent_id.into(),
            content: content.into(),
            round,
            skipped: false,
        }
    }

    pub fn skipped(agent_id: impl Into<String>, round: u32, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            content: reason.into(),
            round,
            skipped: true,
        }
    }
}

/// A bounded, moderated multi-agent conversation toward a goal (Entity)
///
/// The transcript is append-only and totally ordered by round then
/// speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationSession {
    pub id: String,
    pub goal: String,
    /// Ordered agent instance ids
    pub participants: Vec<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub round_count: u32,
    pub max_rounds: u32,
    pub termination: Option<Termination>,
    /// The deliverable built so far; complete only if termination is GoalMet
    pub deliverable: Deliverable,
}

impl CollaborationSession {
    pub fn new(
        goal: impl Into<String>,
        participants: Vec<String>,
        max_rounds: u32,
    ) -> Self {
        Self {
            id: format!("collab-{}", Uuid::new_v4()),
            goal: goal.into(),
            participants,
            transcript: Vec::new(),
            round_count: 0,
            max_rounds,
            termination: None,
            deliverable: Deliverable::default(),
        }
    }

    pub fn append(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    /// Truthful status line for the caller. Incomplete endings name what
    /// is missing instead of claiming success.
    pub fn describe(&self) -> String {
        match self.termination {
            Some(Termination::GoalMet) => {
                format!("goal met after {} rounds", self.round_count)
            }
            Some(term) => format!(
                "incomplete ({term} after {} rounds), missing: {}",
                self.round_count,
                self.deliverable.missing_sections().join(", ")
            ),
            None => "in progress".to_string(),
        }
    }
}
