//! Submit Turn use case: the per-session PDCA state machine
//!
//! Owns all session mutation. Turns for one session are serialized behind
//! a per-session lock and applied in arrival order; unrelated sessions
//! proceed fully in parallel. No transition is applied before the
//! decision for that turn has been computed.
//!
//! A pending decision is resolved by matching the next turn's intent
//! against it, not by re-classifying the text from a blank slate. That is
//! what keeps "yes, create the team" from looping back to the same plan
//! template.

use crate::config::EngineParams;
use crate::ports::event_publisher::{CoordinatorEvent, EventPublisher};
use crate::use_cases::classify_turn::{Classification, ClassifyTurnUseCase};
use crate::use_cases::create_agents::CreateAgentsUseCase;
use crate::use_cases::run_collaboration::{RunCollaborationError, RunCollaborationUseCase};
use foreman_domain::session::slots;
use foreman_domain::{
    Decision, DecisionKind, DecisionTier, DomainError, MemoryDigest, PdcaPhase, RosterOutcome,
    Session, SessionRepository, Termination, Turn, TurnAction, TurnIntent, match_intent,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex as SyncMutex;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Errors that can escape the state machine. Everything operational is
/// converted into a truthful [`TurnOutcome`] instead.
#[derive(Error, Debug)]
pub enum SubmitTurnError {
    #[error("Empty turn text")]
    EmptyTurn,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// What one submitted turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub phase: PdcaPhase,
    pub decision: Decision,
    pub action: TurnAction,
    /// User-facing status line; truthful about partial failures
    pub message: String,
}

pub struct SubmitTurnUseCase {
    classifier: Arc<ClassifyTurnUseCase>,
    sessions: Arc<dyn SessionRepository>,
    roster: Arc<CreateAgentsUseCase>,
    collaboration: Arc<RunCollaborationUseCase>,
    publisher: Arc<dyn EventPublisher>,
    params: EngineParams,
    /// One serialization token per session id. The map lock is synchronous
    /// and never held across an await; the per-session token is.
    locks: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    /// Sessions with a decision computation in flight. Two entries for the
    /// same id would mean the serialization above is broken.
    in_flight: SyncMutex<HashSet<String>>,
}

impl SubmitTurnUseCase {
    pub fn new(
        classifier: Arc<ClassifyTurnUseCase>,
        sessions: Arc<dyn SessionRepository>,
        roster: Arc<CreateAgentsUseCase>,
        collaboration: Arc<RunCollaborationUseCase>,
        publisher: Arc<dyn EventPublisher>,
        params: EngineParams,
    ) -> Self {
        Self {
            classifier,
            sessions,
            roster,
            collaboration,
            publisher,
            params,
            locks: SyncMutex::new(HashMap::new()),
            in_flight: SyncMutex::new(HashSet::new()),
        }
    }

    /// Submit one user turn. Turns to the same session are applied in
    /// arrival order; this call returns only after the turn's transition
    /// has been applied and persisted.
    pub async fn execute(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<TurnOutcome, SubmitTurnError> {
        if text.trim().is_empty() {
            return Err(SubmitTurnError::EmptyTurn);
        }

        let lock = {
            let mut locks = self.locks.lock().expect("lock map poisoned");
            Arc::clone(
                locks
                    .entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let _token = lock.lock().await;

        {
            let mut in_flight = self.in_flight.lock().expect("in-flight set poisoned");
            if !in_flight.insert(session_id.to_string()) {
                return Err(DomainError::InvariantViolation(format!(
                    "concurrent decision computation for session {session_id}"
                ))
                .into());
            }
        }

        let result = self.execute_locked(session_id, text).await;

        self.in_flight
            .lock()
            .expect("in-flight set poisoned")
            .remove(session_id);

        result
    }

    /// Close a session: retire its agents and drop its serialization
    /// state so the lock map does not grow without bound. A later turn
    /// for the same id starts over with a fresh lock.
    pub async fn close_session(&self, session_id: &str) -> Result<usize, DomainError> {
        let lock = {
            let mut locks = self.locks.lock().expect("lock map poisoned");
            Arc::clone(
                locks
                    .entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let _token = lock.lock().await;

        if self.sessions.load(session_id).await?.is_none() {
            return Err(DomainError::SessionNotFound(session_id.to_string()));
        }
        let retired = self.roster.retire_session(session_id).await?;

        self.locks
            .lock()
            .expect("lock map poisoned")
            .remove(session_id);
        info!(session = %session_id, retired, "session closed");
        Ok(retired)
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().expect("lock map poisoned").len()
    }

    async fn execute_locked(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<TurnOutcome, SubmitTurnError> {
        let mut session = match self.sessions.load(session_id).await? {
            Some(session) => session,
            None => {
                info!(session = %session_id, "creating session on first turn");
                Session::new(session_id)
            }
        };
        let phase_before = session.phase();

        // A pending decision is matched against the turn's intent first.
        let outcome = if let Some(pending) = session.pending_decision().cloned() {
            match match_intent(text) {
                TurnIntent::Affirm => {
                    session.take_pending_decision();
                    self.apply_confirmed(&mut session, text, pending).await?
                }
                TurnIntent::Reject => {
                    session.take_pending_decision();
                    if session.phase() == PdcaPhase::PlanReady {
                        session.set_phase(PdcaPhase::PlanGathering);
                    }
                    self.finish_turn(
                        &mut session,
                        text,
                        pending,
                        TurnAction::RejectedPending,
                        "Understood, dropping that proposal. What should change?".to_string(),
                    )
                }
                TurnIntent::Other => self.classify_and_apply(&mut session, text).await?,
            }
        } else if session.phase() == PdcaPhase::Check
            && match_intent(text) == TurnIntent::Affirm
        {
            // Accepting the deliverable under review closes the loop.
            session.set_phase(PdcaPhase::Act);
            let decision = Decision::new(
                DecisionKind::Fallback {
                    reason: "deliverable accepted".to_string(),
                },
                DecisionTier::Rules,
                1.0,
            );
            self.finish_turn(
                &mut session,
                text,
                decision,
                TurnAction::ConfirmedPending {
                    new_phase: PdcaPhase::Act,
                },
                "Deliverable accepted.".to_string(),
            )
        } else {
            self.classify_and_apply(&mut session, text).await?
        };

        if session.phase() != phase_before {
            self.publisher.publish(CoordinatorEvent::PhaseChanged {
                session_id: session_id.to_string(),
                phase: session.phase(),
            });
        }

        self.sessions.save(&session).await?;
        Ok(outcome)
    }

    /// Classify the turn through the tier chain and apply the resulting
    /// decision as a transition.
    async fn classify_and_apply(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<TurnOutcome, SubmitTurnError> {
        let Classification {
            decision,
            slot_deltas,
            memory_digest,
        } = self.classifier.classify(session, text).await;

        self.publisher.publish(CoordinatorEvent::DecisionMade {
            session_id: session.id().to_string(),
            kind: decision.kind.as_str().to_string(),
            tier: decision.source_tier,
            confidence: decision.confidence,
        });

        session.merge_slots(slot_deltas);

        match decision.kind.clone() {
            DecisionKind::AskClarifyingQuestion { question } => {
                if session.phase() == PdcaPhase::PlanGathering {
                    session.bump_gathering_turns();
                    if session.gathering_turns() >= self.params.max_gathering_turns {
                        return Ok(self.force_progression(session, text, decision, &memory_digest));
                    }
                }
                Ok(self.finish_turn(session, text, decision, TurnAction::AskedQuestion, question))
            }
            DecisionKind::ProposePlan { summary } => {
                if session.phase() == PdcaPhase::PlanGathering {
                    session.set_phase(PdcaPhase::PlanReady);
                }
                session.set_pending_decision(decision.clone());
                let message = format!("{summary}. Shall I set up the team?");
                Ok(self.finish_turn(session, text, decision, TurnAction::ProposedPlan, message))
            }
            DecisionKind::RecommendAgentTeam { roles } => {
                session.set_pending_decision(decision.clone());
                let message = format!(
                    "A team of {} would fit: {}. Say the word and I will create them.",
                    roles.len(),
                    roles.join(", ")
                );
                Ok(self.finish_turn(session, text, decision, TurnAction::RecommendedTeam, message))
            }
            DecisionKind::CreateAgents { roles } => {
                let outcome = self.create_team(session, &roles).await;
                Ok(self.record_roster(session, text, decision, outcome))
            }
            DecisionKind::EscalateToCollaboration { goal, .. } => {
                self.run_collaboration(session, text, decision, &goal).await
            }
            DecisionKind::Fallback { reason } => {
                warn!(session = %session.id(), "fallback decision: {reason}");
                Ok(self.finish_turn(
                    session,
                    text,
                    decision,
                    TurnAction::ReportedFailure { reason: reason.clone() },
                    reason,
                ))
            }
        }
    }

    /// Apply a pending decision the user just affirmed.
    async fn apply_confirmed(
        &self,
        session: &mut Session,
        text: &str,
        pending: Decision,
    ) -> Result<TurnOutcome, SubmitTurnError> {
        match pending.kind.clone() {
            // A confirmed plan moves Plan -> Do and stands up the team.
            DecisionKind::ProposePlan { .. } => {
                session.set_phase(PdcaPhase::Do);
                let roles = self.roster.catalog().role_names();
                let outcome = self.create_team(session, &roles).await;
                let decision =
                    Decision::new(DecisionKind::CreateAgents { roles }, pending.source_tier, 1.0);
                Ok(self.record_roster(session, text, decision, outcome))
            }
            DecisionKind::RecommendAgentTeam { roles }
            | DecisionKind::CreateAgents { roles } => {
                if session.phase().is_plan() {
                    session.set_phase(PdcaPhase::Do);
                }
                let outcome = self.create_team(session, &roles).await;
                let decision =
                    Decision::new(DecisionKind::CreateAgents { roles }, pending.source_tier, 1.0);
                Ok(self.record_roster(session, text, decision, outcome))
            }
            DecisionKind::EscalateToCollaboration { goal, .. } => {
                let goal = goal.clone();
                self.run_collaboration(session, text, pending, &goal).await
            }
            DecisionKind::AskClarifyingQuestion { .. } | DecisionKind::Fallback { .. } => {
                // Nothing actionable was pending; classify normally.
                self.classify_and_apply(session, text).await
            }
        }
    }

    async fn create_team(&self, session: &Session, roles: &[String]) -> RosterOutcome {
        self.roster.execute(session.id(), roles).await
    }

    /// Record a roster outcome, advancing the Do sub-state only when the
    /// whole team was verified. Partial failure is surfaced as a partial
    /// success, never as unconditional success.
    fn record_roster(
        &self,
        session: &mut Session,
        text: &str,
        decision: Decision,
        outcome: RosterOutcome,
    ) -> TurnOutcome {
        if outcome.is_complete() && !outcome.created.is_empty() && session.phase().is_do() {
            session.set_phase(PdcaPhase::DoActive);
        }
        let action = TurnAction::CreatedAgents {
            created: outcome.created.iter().map(|a| a.id.clone()).collect(),
            failed: outcome.failed.clone(),
        };
        let message = outcome.describe();
        self.finish_turn(session, text, decision, action, message)
    }

    async fn run_collaboration(
        &self,
        session: &mut Session,
        text: &str,
        decision: Decision,
        goal: &str,
    ) -> Result<TurnOutcome, SubmitTurnError> {
        match self.collaboration.execute(session.id(), goal).await {
            Ok(collab) => {
                session.set_phase(PdcaPhase::Check);
                let termination = collab.termination.unwrap_or(Termination::RoundCap);
                let action = TurnAction::RanCollaboration {
                    collaboration_id: collab.id.clone(),
                    termination,
                };
                let message = format!("Collaboration {}: {}", collab.id, collab.describe());
                Ok(self.finish_turn(session, text, decision, action, message))
            }
            Err(RunCollaborationError::NoParticipants(_)) => {
                let reason = "no active agents for this session; create the team first".to_string();
                Ok(self.finish_turn(
                    session,
                    text,
                    decision,
                    TurnAction::ReportedFailure { reason: reason.clone() },
                    reason,
                ))
            }
            Err(RunCollaborationError::Domain(e)) => Err(e.into()),
        }
    }

    /// The gathering loop hit its cap: fill the minimum set with assumed
    /// defaults and propose a plan flagged as such.
    fn force_progression(
        &self,
        session: &mut Session,
        text: &str,
        decision: Decision,
        digest: &MemoryDigest,
    ) -> TurnOutcome {
        let mut assumed = session.slots().clone();
        slots::fill_assumed_defaults(&mut assumed);
        session.merge_slots(assumed);

        let project = session
            .slots()
            .get(slots::PROJECT_TYPE)
            .map(|s| s.value.clone())
            .unwrap_or_else(|| "project".to_string());
        let summary = format!(
            "Plan for {project} (some requirements assumed); {}",
            digest.render()
        );
        let proposal = Decision::new(
            DecisionKind::ProposePlan {
                summary: summary.clone(),
            },
            decision.source_tier,
            decision.confidence,
        );
        session.set_phase(PdcaPhase::PlanReady);
        session.set_pending_decision(proposal.clone());

        let message = format!("{summary}. Shall I set up the team?");
        self.finish_turn(session, text, proposal, TurnAction::ForcedProgression, message)
    }

    /// Record the turn in the session history and build the outcome.
    fn finish_turn(
        &self,
        session: &mut Session,
        text: &str,
        decision: Decision,
        action: TurnAction,
        message: String,
    ) -> TurnOutcome {
        session.record_turn(Turn::new(text, decision.clone(), action.clone()));
        TurnOutcome {
            session_id: session.id().to_string(),
            phase: session.phase(),
            decision,
            action,
            message,
        }
    }
}
