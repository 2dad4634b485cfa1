//! Run Collaboration use case: the bounded multi-agent executor
//!
//! Runs a moderated conversation among a session's agent instances toward
//! a stated goal. Rounds are capped, every agent call carries its own
//! deadline, and termination is decided by a deterministic predicate over
//! the deliverable, never by a model's opinion of "looks done". Round-cap
//! and deadlock endings return the partial transcript flagged incomplete.

use crate::config::EngineParams;
use crate::ports::event_publisher::{CoordinatorEvent, EventPublisher, content_digest};
use crate::ports::inference_gateway::{InferenceGateway, InferenceRequest};
use crate::ports::instance_store::{CollaborationStore, InstanceStore};
use crate::ports::memory_gateway::MemoryGateway;
use foreman_domain::collaboration::deliverable::{contains_stop, parse_needs};
use foreman_domain::{
    AgentInstance, BackendId, CollaborationSession, DomainError, MemoryRecord,
    RoleCatalog, Termination, TranscriptEntry,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur starting a collaboration. Once running, failures
/// are expressed through the session's termination, not through errors.
#[derive(Error, Debug)]
pub enum RunCollaborationError {
    #[error("No active agents for session {0}")]
    NoParticipants(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub struct RunCollaborationUseCase {
    inference: Arc<dyn InferenceGateway>,
    memory: Arc<dyn MemoryGateway>,
    catalog: Arc<RoleCatalog>,
    instances: Arc<dyn InstanceStore>,
    collaborations: Arc<dyn CollaborationStore>,
    publisher: Arc<dyn EventPublisher>,
    params: EngineParams,
}

impl RunCollaborationUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inference: Arc<dyn InferenceGateway>,
        memory: Arc<dyn MemoryGateway>,
        catalog: Arc<RoleCatalog>,
        instances: Arc<dyn InstanceStore>,
        collaborations: Arc<dyn CollaborationStore>,
        publisher: Arc<dyn EventPublisher>,
        params: EngineParams,
    ) -> Self {
        Self {
            inference,
            memory,
            catalog,
            instances,
            collaborations,
            publisher,
            params,
        }
    }

    /// Run one bounded collaboration for the session's active agents.
    pub async fn execute(
        &self,
        session_id: &str,
        goal: &str,
    ) -> Result<CollaborationSession, RunCollaborationError> {
        let participants: Vec<AgentInstance> = self
            .instances
            .list_for_session(session_id)
            .await?
            .into_iter()
            .filter(AgentInstance::is_active)
            .collect();

        if participants.is_empty() {
            return Err(RunCollaborationError::NoParticipants(
                session_id.to_string(),
            ));
        }

        let memory_context = self
            .memory
            .search(goal, self.params.memory_k, self.params.memory_min_score)
            .await;

        let mut session = CollaborationSession::new(
            goal,
            participants.iter().map(|p| p.id.clone()).collect(),
            self.params.max_rounds,
        );

        info!(
            collaboration = %session.id,
            participants = participants.len(),
            "starting collaboration: {goal}"
        );

        let mut next_idx = 0usize;
        let mut consecutive_skips = 0usize;

        while session.termination.is_none() {
            // Moderator: goal-directed selection when the last speaker
            // declared an unmet dependency, round-robin otherwise.
            let idx = self
                .dependency_target(&session, &participants)
                .unwrap_or(next_idx);
            let speaker = &participants[idx];
            next_idx = (idx + 1) % participants.len();

            session.round_count += 1;
            let round = session.round_count;

            let request = self.agent_request(speaker, &session, &memory_context);
            let entry = match tokio::time::timeout(
                self.params.round_timeout(),
                self.inference.complete_text(request),
            )
            .await
            {
                Ok(Ok(content)) => {
                    consecutive_skips = 0;
                    session.deliverable.absorb(&content);
                    TranscriptEntry::spoken(&speaker.id, content, round)
                }
                Ok(Err(e)) => {
                    warn!(agent = %speaker.id, round, "agent turn failed: {e}");
                    consecutive_skips += 1;
                    TranscriptEntry::skipped(&speaker.id, round, format!("turn failed: {e}"))
                }
                Err(_) => {
                    warn!(agent = %speaker.id, round, "agent turn exceeded its deadline");
                    consecutive_skips += 1;
                    TranscriptEntry::skipped(&speaker.id, round, "deadline exceeded")
                }
            };

            self.publisher.publish(CoordinatorEvent::CollaborationRound {
                collaboration_id: session.id.clone(),
                agent_id: speaker.id.clone(),
                round,
                digest: content_digest(&entry.content),
            });

            let explicit_stop = !entry.skipped && contains_stop(&entry.content);
            session.append(entry);

            // Moderator termination checks, in order.
            session.termination = if session.deliverable.is_complete() {
                Some(Termination::GoalMet)
            } else if explicit_stop {
                Some(Termination::ExplicitStop)
            } else if consecutive_skips >= participants.len() {
                Some(Termination::Deadlock)
            } else if session.round_count >= session.max_rounds {
                Some(Termination::RoundCap)
            } else {
                None
            };
        }

        let termination = session.termination.unwrap_or(Termination::RoundCap);
        info!(collaboration = %session.id, "{}", session.describe());

        self.collaborations.save(&session).await?;
        self.publisher
            .publish(CoordinatorEvent::CollaborationFinished {
                collaboration_id: session.id.clone(),
                termination,
                rounds: session.round_count,
            });

        Ok(session)
    }

    /// Index of the participant the last (spoken) entry declared a
    /// dependency on, if any.
    fn dependency_target(
        &self,
        session: &CollaborationSession,
        participants: &[AgentInstance],
    ) -> Option<usize> {
        let last = session.transcript.iter().rev().find(|e| !e.skipped)?;
        let needed_role = parse_needs(&last.content)?;
        participants.iter().position(|p| p.role == needed_role)
    }

    fn agent_request(
        &self,
        speaker: &AgentInstance,
        session: &CollaborationSession,
        memory: &[MemoryRecord],
    ) -> InferenceRequest {
        let role = self.catalog.get(&speaker.role);
        let directive = role.map(|r| r.directive.as_str()).unwrap_or_default();
        let backend = role
            .map(|r| r.preferred_backend.clone())
            .unwrap_or(BackendId::Local);

        let system_prompt = format!(
            "You are the {role} agent in a planning conversation. {directive} \
             Contribute structured lines: 'OBJECTIVE: <text>', \
             'TASK: <title> | <owner role> | <estimate>', 'RISK: <text>', \
             'ACCEPTANCE: <text>'. If you are blocked on another role's \
             output, write 'NEEDS: <role>'. When the plan is complete, \
             write a line containing only STOP.",
            role = speaker.role,
        );

        let mut prompt = format!("Goal: {}\n", session.goal);
        if !memory.is_empty() {
            prompt.push_str("Relevant history:\n");
            for record in memory {
                prompt.push_str(&format!("  - {}\n", record.summary));
            }
        }
        prompt.push_str("Transcript so far:\n");
        if session.transcript.is_empty() {
            prompt.push_str("  (empty, you speak first)\n");
        }
        for entry in &session.transcript {
            if entry.skipped {
                prompt.push_str(&format!("  [{}] (skipped turn)\n", entry.agent_id));
            } else {
                prompt.push_str(&format!("  [{}] {}\n", entry.agent_id, entry.content));
            }
        }
        prompt.push_str("Your contribution:\n");

        InferenceRequest::new(backend, system_prompt, prompt, self.params.round_timeout())
    }
}
