//! Coordinator facade: the thin tool surface
//!
//! Wires the use cases together and exposes the four operations an
//! external caller (CLI, protocol adapter) consumes: submit a turn, read
//! a session, create agents, run a collaboration. Views are plain
//! serializable snapshots.

use crate::config::EngineParams;
use crate::ports::event_publisher::EventPublisher;
use crate::ports::inference_gateway::InferenceGateway;
use crate::ports::instance_store::{CollaborationStore, InstanceStore};
use crate::ports::memory_gateway::MemoryGateway;
use crate::use_cases::classify_turn::ClassifyTurnUseCase;
use crate::use_cases::create_agents::CreateAgentsUseCase;
use crate::use_cases::run_collaboration::{RunCollaborationError, RunCollaborationUseCase};
use crate::use_cases::submit_turn::{SubmitTurnError, SubmitTurnUseCase};
use foreman_domain::{
    CollaborationSession, DomainError, RoleCatalog, RosterOutcome, Session, SessionRepository,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Snapshot of one turn's result for external callers
#[derive(Debug, Clone, Serialize)]
pub struct DecisionView {
    pub session_id: String,
    pub phase: String,
    pub decision: String,
    pub tier: String,
    pub confidence: f64,
    pub action: String,
    pub message: String,
}

/// Snapshot of a session for external callers
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub phase: String,
    pub slots: BTreeMap<String, String>,
    pub assumed_slots: Vec<String>,
    pub turns: usize,
    pub pending_decision: Option<String>,
    pub created_at: String,
}

impl SessionView {
    fn from_session(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            phase: session.phase().as_str().to_string(),
            slots: session
                .slots()
                .iter()
                .map(|(k, v)| (k.clone(), v.value.clone()))
                .collect(),
            assumed_slots: session
                .slots()
                .iter()
                .filter(|(_, v)| v.assumed)
                .map(|(k, _)| k.clone())
                .collect(),
            turns: session.history().len(),
            pending_decision: session
                .pending_decision()
                .map(|d| d.kind.as_str().to_string()),
            created_at: session.created_at().to_rfc3339(),
        }
    }
}

/// The coordinator's public face
pub struct CoordinatorService {
    submit: SubmitTurnUseCase,
    sessions: Arc<dyn SessionRepository>,
    roster: Arc<CreateAgentsUseCase>,
    collaboration: Arc<RunCollaborationUseCase>,
}

impl CoordinatorService {
    /// Wire the full coordination core from its external dependencies.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inference: Arc<dyn InferenceGateway>,
        memory: Arc<dyn MemoryGateway>,
        sessions: Arc<dyn SessionRepository>,
        instances: Arc<dyn InstanceStore>,
        collaborations: Arc<dyn CollaborationStore>,
        publisher: Arc<dyn EventPublisher>,
        catalog: Arc<RoleCatalog>,
        params: EngineParams,
    ) -> Self {
        let params = params.sanitized();
        let classifier = Arc::new(ClassifyTurnUseCase::new(
            Arc::clone(&inference),
            Arc::clone(&memory),
            params.clone(),
        ));
        let roster = Arc::new(CreateAgentsUseCase::new(
            Arc::clone(&catalog),
            Arc::clone(&instances),
            Arc::clone(&publisher),
        ));
        let collaboration = Arc::new(RunCollaborationUseCase::new(
            inference,
            memory,
            catalog,
            instances,
            collaborations,
            Arc::clone(&publisher),
            params.clone(),
        ));
        let submit = SubmitTurnUseCase::new(
            classifier,
            Arc::clone(&sessions),
            Arc::clone(&roster),
            Arc::clone(&collaboration),
            publisher,
            params,
        );

        Self {
            submit,
            sessions,
            roster,
            collaboration,
        }
    }

    /// Submit one user turn and get the decision taken for it.
    pub async fn submit_turn(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<DecisionView, SubmitTurnError> {
        let outcome = self.submit.execute(session_id, text).await?;
        Ok(DecisionView {
            session_id: outcome.session_id,
            phase: outcome.phase.as_str().to_string(),
            decision: outcome.decision.kind.as_str().to_string(),
            tier: outcome.decision.source_tier.as_str().to_string(),
            confidence: outcome.decision.confidence,
            action: outcome.action.as_str().to_string(),
            message: outcome.message,
        })
    }

    /// Read a session snapshot.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionView, DomainError> {
        let session = self
            .sessions
            .load(session_id)
            .await?
            .ok_or_else(|| DomainError::SessionNotFound(session_id.to_string()))?;
        Ok(SessionView::from_session(&session))
    }

    /// Create agents for the named roles, outside the conversational flow.
    pub async fn create_agents(&self, session_id: &str, roles: &[String]) -> RosterOutcome {
        self.roster.execute(session_id, roles).await
    }

    /// Close a session, retiring its agents. Returns how many were
    /// retired.
    pub async fn close_session(&self, session_id: &str) -> Result<usize, DomainError> {
        self.submit.close_session(session_id).await
    }

    /// Run a collaboration toward a goal with the session's agents.
    pub async fn run_collaboration(
        &self,
        session_id: &str,
        goal: &str,
    ) -> Result<CollaborationSession, RunCollaborationError> {
        self.collaboration.execute(session_id, goal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::event_publisher::{CoordinatorEvent, NoopPublisher};
    use crate::ports::inference_gateway::{GatewayError, InferenceRequest};
    use crate::ports::memory_gateway::NoMemory;
    use async_trait::async_trait;
    use foreman_domain::{AgentInstance, Termination};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct InMemoryState {
        sessions: Mutex<HashMap<String, Session>>,
        instances: Mutex<HashMap<String, AgentInstance>>,
        collaborations: Mutex<HashMap<String, CollaborationSession>>,
    }

    #[async_trait]
    impl SessionRepository for InMemoryState {
        async fn load(&self, id: &str) -> Result<Option<Session>, DomainError> {
            Ok(self.sessions.lock().unwrap().get(id).cloned())
        }

        async fn save(&self, session: &Session) -> Result<(), DomainError> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.id().to_string(), session.clone());
            Ok(())
        }

        async fn list_ids(&self) -> Result<Vec<String>, DomainError> {
            Ok(self.sessions.lock().unwrap().keys().cloned().collect())
        }
    }

    #[async_trait]
    impl crate::ports::instance_store::InstanceStore for InMemoryState {
        async fn put(&self, instance: AgentInstance) -> Result<(), DomainError> {
            self.instances
                .lock()
                .unwrap()
                .insert(instance.id.clone(), instance);
            Ok(())
        }

        async fn get(&self, id: &str) -> Result<Option<AgentInstance>, DomainError> {
            Ok(self.instances.lock().unwrap().get(id).cloned())
        }

        async fn list_for_session(
            &self,
            session_id: &str,
        ) -> Result<Vec<AgentInstance>, DomainError> {
            let mut found: Vec<AgentInstance> = self
                .instances
                .lock()
                .unwrap()
                .values()
                .filter(|i| i.session_id == session_id)
                .cloned()
                .collect();
            found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(found)
        }
    }

    #[async_trait]
    impl crate::ports::instance_store::CollaborationStore for InMemoryState {
        async fn save(&self, session: &CollaborationSession) -> Result<(), DomainError> {
            self.collaborations
                .lock()
                .unwrap()
                .insert(session.id.clone(), session.clone());
            Ok(())
        }

        async fn load(&self, id: &str) -> Result<Option<CollaborationSession>, DomainError> {
            Ok(self.collaborations.lock().unwrap().get(id).cloned())
        }
    }

    /// Classification calls fail (tier 0 or safe default decide);
    /// collaboration turns are scripted per role. Tracks how many
    /// classification calls overlap in time.
    struct TestInference {
        concurrent: AtomicUsize,
        max_concurrent: AtomicUsize,
    }

    impl TestInference {
        fn new() -> Self {
            Self {
                concurrent: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl crate::ports::inference_gateway::InferenceGateway for TestInference {
        async fn complete_text(&self, request: InferenceRequest) -> Result<String, GatewayError> {
            let reply = [
                ("architect", "OBJECTIVE: Ship sprint 1 of the fitness tracker"),
                ("developer", "TASK: Set up CI | developer | 1d"),
                ("tester", "RISK: unclear auth scope\nACCEPTANCE: record one workout"),
                ("project_manager", "TASK: backlog grooming | project_manager | 2h"),
            ]
            .iter()
            .find(|(role, _)| request.system_prompt.contains(&format!("the {role} agent")))
            .map(|(_, reply)| reply.to_string())
            .unwrap_or_default();
            Ok(reply)
        }

        async fn complete_structured(
            &self,
            _request: InferenceRequest,
        ) -> Result<serde_json::Value, GatewayError> {
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);
            Err(GatewayError::BackendUnavailable("not scripted".to_string()))
        }
    }

    fn coordinator(
        state: Arc<InMemoryState>,
        inference: Arc<TestInference>,
    ) -> CoordinatorService {
        CoordinatorService::new(
            inference,
            Arc::new(NoMemory),
            Arc::clone(&state) as Arc<dyn SessionRepository>,
            Arc::clone(&state) as Arc<dyn crate::ports::instance_store::InstanceStore>,
            state as Arc<dyn crate::ports::instance_store::CollaborationStore>,
            Arc::new(NoopPublisher),
            Arc::new(RoleCatalog::builtin()),
            EngineParams::default(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_fitness_tracker_scenario() {
        let state = Arc::new(InMemoryState::default());
        let inference = Arc::new(TestInference::new());
        let coordinator = coordinator(Arc::clone(&state), inference);

        // Turn 1: tier 0 extracts the project type and proposes a plan
        // with truthful (empty) memory context.
        let view = coordinator
            .submit_turn("s-1", "I want to build a web application for tracking fitness goals")
            .await
            .unwrap();
        assert_eq!(view.tier, "rules");
        assert_eq!(view.decision, "propose_plan");
        assert!(view.message.contains("0 similar projects found"));

        let session = coordinator.get_session("s-1").await.unwrap();
        assert_eq!(session.slots.get("project_type").unwrap(), "web_application");
        assert_eq!(session.pending_decision.as_deref(), Some("propose_plan"));

        // Turn 2: the affirmation is matched against the pending plan and
        // stands up the default team of four.
        let view = coordinator
            .submit_turn("s-1", "yes, create the team")
            .await
            .unwrap();
        assert_eq!(view.action, "created_agents");
        assert_eq!(view.message, "created 4 agents");
        assert_eq!(view.phase, "do.active");

        // Every created instance is independently retrievable.
        let instances = crate::ports::instance_store::InstanceStore::list_for_session(
            state.as_ref(),
            "s-1",
        )
        .await
        .unwrap();
        assert_eq!(instances.len(), 4);
        for instance in &instances {
            let found =
                crate::ports::instance_store::InstanceStore::get(state.as_ref(), &instance.id)
                    .await
                    .unwrap();
            assert!(found.is_some());
        }

        // The collaboration reaches the goal within the round cap.
        let collab = coordinator
            .run_collaboration("s-1", "sprint 1 plan")
            .await
            .unwrap();
        assert_eq!(collab.termination, Some(Termination::GoalMet));
        assert!(collab.round_count <= collab.max_rounds);
        assert!(collab.deliverable.is_complete());
    }

    #[tokio::test]
    async fn test_concurrent_turns_are_serialized_in_order() {
        let state = Arc::new(InMemoryState::default());
        let inference = Arc::new(TestInference::new());
        let coordinator = coordinator(Arc::clone(&state), Arc::clone(&inference));

        // Vague turns force the chain into the (instrumented) model tiers.
        let (a, b) = tokio::join!(
            coordinator.submit_turn("s-1", "hmm, first thought"),
            coordinator.submit_turn("s-1", "hmm, second thought"),
        );
        a.unwrap();
        b.unwrap();

        // Never two classification calls in flight for one session.
        assert_eq!(inference.max_concurrent.load(Ordering::SeqCst), 1);

        // Turn A's transition was applied before turn B's.
        let session = SessionRepository::load(state.as_ref(), "s-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].text, "hmm, first thought");
        assert_eq!(session.history()[1].text, "hmm, second thought");
    }

    #[tokio::test]
    async fn test_sessions_proceed_independently() {
        let state = Arc::new(InMemoryState::default());
        let inference = Arc::new(TestInference::new());
        let coordinator = coordinator(Arc::clone(&state), inference);

        let (a, b) = tokio::join!(
            coordinator.submit_turn("s-1", "a web app for tracking fitness goals"),
            coordinator.submit_turn("s-2", "a mobile app in kotlin for notes"),
        );
        assert_eq!(a.unwrap().session_id, "s-1");
        assert_eq!(b.unwrap().session_id, "s-2");

        let s1 = coordinator.get_session("s-1").await.unwrap();
        let s2 = coordinator.get_session("s-2").await.unwrap();
        assert_eq!(s1.slots.get("project_type").unwrap(), "web_application");
        assert_eq!(s2.slots.get("project_type").unwrap(), "mobile_application");
    }

    #[tokio::test]
    async fn test_rejected_plan_resumes_gathering() {
        let state = Arc::new(InMemoryState::default());
        let inference = Arc::new(TestInference::new());
        let coordinator = coordinator(Arc::clone(&state), inference);

        coordinator
            .submit_turn("s-1", "a web application for tracking fitness goals")
            .await
            .unwrap();
        let view = coordinator
            .submit_turn("s-1", "no, that's not it")
            .await
            .unwrap();
        assert_eq!(view.action, "rejected_pending");
        assert_eq!(view.phase, "plan.gathering");

        let session = coordinator.get_session("s-1").await.unwrap();
        assert_eq!(session.pending_decision, None);
    }

    #[tokio::test]
    async fn test_collaboration_without_agents_is_reported() {
        let state = Arc::new(InMemoryState::default());
        let inference = Arc::new(TestInference::new());
        let coordinator = coordinator(Arc::clone(&state), inference);

        let result = coordinator.run_collaboration("s-9", "sprint 1 plan").await;
        assert!(matches!(
            result,
            Err(RunCollaborationError::NoParticipants(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_turn_is_rejected() {
        let state = Arc::new(InMemoryState::default());
        let inference = Arc::new(TestInference::new());
        let coordinator = coordinator(state, inference);

        let result = coordinator.submit_turn("s-1", "   ").await;
        assert!(matches!(result, Err(SubmitTurnError::EmptyTurn)));
    }

    #[test]
    fn test_event_topics_cover_all_variants() {
        let event = CoordinatorEvent::DecisionMade {
            session_id: "s-1".to_string(),
            kind: "propose_plan".to_string(),
            tier: foreman_domain::DecisionTier::Rules,
            confidence: 0.9,
        };
        assert_eq!(event.topic(), "decisions");
    }
}
