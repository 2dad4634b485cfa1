//! Session domain entities

use super::phase::PdcaPhase;
use super::slots::SlotValue;
use crate::collaboration::Termination;
use crate::decision::Decision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The action the state machine took when applying a turn's decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TurnAction {
    /// Stayed in the gathering loop and asked a question
    AskedQuestion,
    /// Recorded a plan proposal awaiting confirmation
    ProposedPlan,
    /// Informational team recommendation, no phase change
    RecommendedTeam,
    /// Applied a confirmed pending decision and advanced phase
    ConfirmedPending { new_phase: PdcaPhase },
    /// Dropped a rejected pending decision
    RejectedPending,
    /// Created agent instances; partial failure is reported, not hidden
    CreatedAgents {
        created: Vec<String>,
        failed: Vec<String>,
    },
    /// Ran a collaboration and attached its outcome
    RanCollaboration {
        collaboration_id: String,
        termination: Termination,
    },
    /// Gathering hit its turn cap; progressed with assumed defaults
    ForcedProgression,
    /// An operation could not take effect; the reason is surfaced verbatim
    ReportedFailure { reason: String },
}

impl TurnAction {
    pub fn as_str(&self) -> &str {
        match self {
            TurnAction::AskedQuestion => "asked_question",
            TurnAction::ProposedPlan => "proposed_plan",
            TurnAction::RecommendedTeam => "recommended_team",
            TurnAction::ConfirmedPending { .. } => "confirmed_pending",
            TurnAction::RejectedPending => "rejected_pending",
            TurnAction::CreatedAgents { .. } => "created_agents",
            TurnAction::RanCollaboration { .. } => "ran_collaboration",
            TurnAction::ForcedProgression => "forced_progression",
            TurnAction::ReportedFailure { .. } => "reported_failure",
        }
    }
}

/// One user message, the decision produced for it, and the action taken.
/// Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub text: String,
    pub decision: Decision,
    pub action: TurnAction,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(text: impl Into<String>, decision: Decision, action: TurnAction) -> Self {
        Self {
            text: text.into(),
            decision,
            action,
            at: Utc::now(),
        }
    }
}

/// One ongoing conversation (Entity)
///
/// Owned exclusively by the session state machine: all mutation goes
/// through its serialized per-session handler. History is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: String,
    phase: PdcaPhase,
    slots: BTreeMap<String, SlotValue>,
    history: Vec<Turn>,
    /// The last unresolved decision awaiting a confirmatory turn
    pending_decision: Option<Decision>,
    /// Turns spent in the gathering loop, checked against the cap
    gathering_turns: u32,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phase: PdcaPhase::PlanGathering,
            slots: BTreeMap::new(),
            history: Vec::new(),
            pending_decision: None,
            gathering_turns: 0,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> PdcaPhase {
        self.phase
    }

    pub fn slots(&self) -> &BTreeMap<String, SlotValue> {
        &self.slots
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn pending_decision(&self) -> Option<&Decision> {
        self.pending_decision.as_ref()
    }

    pub fn gathering_turns(&self) -> u32 {
        self.gathering_turns
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a completed turn. History is append-only; there is no way to
    /// rewrite a recorded turn.
    pub fn record_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Merge extracted slots. Stated values overwrite assumed ones but an
    /// assumed value never overwrites a stated one.
    pub fn merge_slots(&mut self, incoming: BTreeMap<String, SlotValue>) {
        for (key, value) in incoming {
            match self.slots.get(&key) {
                Some(existing) if !existing.assumed && value.assumed => {}
                _ => {
                    self.slots.insert(key, value);
                }
            }
        }
    }

    pub fn set_phase(&mut self, phase: PdcaPhase) {
        self.phase = phase;
    }

    pub fn set_pending_decision(&mut self, decision: Decision) {
        self.pending_decision = Some(decision);
    }

    pub fn take_pending_decision(&mut self) -> Option<Decision> {
        self.pending_decision.take()
    }

    pub fn bump_gathering_turns(&mut self) {
        self.gathering_turns += 1;
    }
}
