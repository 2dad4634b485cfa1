//! Classify Turn use case: the tiered decision engine
//!
//! A strict escalation chain over four tiers: deterministic keyword rules,
//! local model, remote model, safe default. The first tier producing a
//! schema-valid result wins. Gateway errors and timeouts are caught per
//! tier and treated as "fall through", never propagated: `classify` cannot
//! fail and returns within the sum of the tier deadlines plus a small
//! constant.

use crate::config::EngineParams;
use crate::ports::inference_gateway::{GatewayError, InferenceGateway, InferenceRequest};
use crate::ports::memory_gateway::MemoryGateway;
use foreman_domain::classify::rules;
use foreman_domain::session::slots;
use foreman_domain::{
    BackendId, Decision, DecisionKind, DecisionTier, MemoryDigest, MemoryRecord, Session,
    SlotValue, tokenize,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You classify one user turn of a software project conversation. Reply with \
a single JSON object and nothing else. The object must have an \"action\" \
field, one of: \"ask\" (with \"question\"), \"propose_plan\" (with \
\"summary\"), \"recommend_team\" (with \"roles\"), \"create_agents\" (with \
\"roles\"), \"collaborate\" (with \"goal\" and \"roles\"). It must also \
have \"confidence\" between 0 and 1, and may have \"slots\", an object of \
extracted requirement values.";

/// Schema for tier-1/2 replies. Anything that fails to decode into this
/// enum is schema-invalid and falls through to the next tier.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClassifierReply {
    Ask {
        question: String,
        #[serde(default)]
        slots: BTreeMap<String, String>,
        confidence: f64,
    },
    ProposePlan {
        summary: String,
        #[serde(default)]
        slots: BTreeMap<String, String>,
        confidence: f64,
    },
    RecommendTeam {
        roles: Vec<String>,
        confidence: f64,
    },
    CreateAgents {
        roles: Vec<String>,
        confidence: f64,
    },
    Collaborate {
        goal: String,
        #[serde(default)]
        roles: Vec<String>,
        confidence: f64,
    },
}

/// Output of classifying one turn
#[derive(Debug, Clone)]
pub struct Classification {
    pub decision: Decision,
    /// Slot deltas for the state machine to merge: the tier-0 rule
    /// extraction, plus any slots the winning model tier reported
    pub slot_deltas: BTreeMap<String, SlotValue>,
    /// Digest of the memory context retrieved for this turn
    pub memory_digest: MemoryDigest,
}

/// The tiered decision engine
pub struct ClassifyTurnUseCase {
    inference: Arc<dyn InferenceGateway>,
    memory: Arc<dyn MemoryGateway>,
    params: EngineParams,
}

impl ClassifyTurnUseCase {
    pub fn new(
        inference: Arc<dyn InferenceGateway>,
        memory: Arc<dyn MemoryGateway>,
        params: EngineParams,
    ) -> Self {
        Self {
            inference,
            memory,
            params,
        }
    }

    /// Classify one turn against a session snapshot. Total latency is
    /// bounded by the tier deadlines; this method never returns an error.
    pub async fn classify(&self, session: &Session, turn_text: &str) -> Classification {
        // One memory search per turn, shared by the rest of the chain.
        let records = self
            .memory
            .search(turn_text, self.params.memory_k, self.params.memory_min_score)
            .await;
        let digest = MemoryDigest::from_records(&records);

        let extraction = rules::classify(turn_text);
        let mut slot_deltas = extraction.slots.clone();

        // Tier 0: deterministic rules.
        if let Some(decision) = self.tier0(session, turn_text, &extraction, &digest) {
            debug!(tier = %decision.source_tier, "classified by rules");
            return Classification {
                decision,
                slot_deltas,
                memory_digest: digest,
            };
        }

        // Tier 1: local model, no retry; retries are the next tier's job.
        if let Some((decision, extracted)) = self
            .model_tier(
                BackendId::Local,
                DecisionTier::LocalModel,
                self.params.local_timeout(),
                session,
                turn_text,
                &[],
                &digest,
            )
            .await
        {
            merge_model_slots(&mut slot_deltas, extracted);
            return Classification {
                decision,
                slot_deltas,
                memory_digest: digest,
            };
        }

        // Tier 2: remote model, enriched with memory context.
        if let Some((decision, extracted)) = self
            .model_tier(
                BackendId::Remote,
                DecisionTier::RemoteModel,
                self.params.remote_timeout(),
                session,
                turn_text,
                &records,
                &digest,
            )
            .await
        {
            merge_model_slots(&mut slot_deltas, extracted);
            return Classification {
                decision,
                slot_deltas,
                memory_digest: digest,
            };
        }

        // Tier 3: safe default. This path can never fail.
        debug!("all inference tiers fell through, using safe default");
        Classification {
            decision: Decision::safe_default(),
            slot_deltas,
            memory_digest: digest,
        }
    }

    /// Tier 0: build a decision from the keyword rules when extraction
    /// confidence clears the threshold.
    fn tier0(
        &self,
        session: &Session,
        turn_text: &str,
        extraction: &rules::RuleClassification,
        digest: &MemoryDigest,
    ) -> Option<Decision> {
        // An explicit collaboration request is deterministic regardless
        // of slot extraction.
        if session.phase().is_do() && wants_collaboration(turn_text) {
            return Some(Decision::new(
                DecisionKind::EscalateToCollaboration {
                    goal: turn_text.to_string(),
                    roles: Vec::new(),
                },
                DecisionTier::Rules,
                0.9,
            ));
        }

        if extraction.confidence < self.params.tier0_confidence_threshold {
            return None;
        }

        // Merge the session view with this turn's extraction to judge the
        // minimum slot set.
        let mut merged: BTreeMap<String, SlotValue> = session.slots().clone();
        merged.extend(extraction.slots.clone());

        let kind = if slots::minimum_set_filled(&merged) {
            DecisionKind::ProposePlan {
                summary: plan_summary(&merged, digest),
            }
        } else {
            let missing = slots::missing_from_minimum_set(&merged);
            DecisionKind::AskClarifyingQuestion {
                question: slots::question_for(missing.first().unwrap_or(&slots::PROJECT_TYPE)),
            }
        };

        Some(Decision::new(kind, DecisionTier::Rules, extraction.confidence))
    }

    /// One inference tier: call the backend under its deadline, decode
    /// against the schema, and convert to a decision. Any failure falls
    /// through by returning `None`.
    async fn model_tier(
        &self,
        backend: BackendId,
        tier: DecisionTier,
        deadline: Duration,
        session: &Session,
        turn_text: &str,
        memory: &[MemoryRecord],
        digest: &MemoryDigest,
    ) -> Option<(Decision, BTreeMap<String, String>)> {
        let request = InferenceRequest::new(
            backend.clone(),
            CLASSIFIER_SYSTEM_PROMPT,
            classification_prompt(session, turn_text, memory),
            deadline,
        );

        // The outer timer bounds the tier even if the adapter ignores the
        // request deadline.
        let reply = match tokio::time::timeout(deadline, self.inference.complete_structured(request))
            .await
        {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!(backend = %backend, tier = %tier, "inference tier failed: {e}");
                return None;
            }
            Err(_) => {
                warn!(backend = %backend, tier = %tier, "inference tier exceeded its deadline");
                return None;
            }
        };

        match decode_reply(reply, tier, digest) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(backend = %backend, tier = %tier, "schema-invalid reply: {e}");
                None
            }
        }
    }
}

/// Detect an explicit request to run the agents together.
fn wants_collaboration(turn_text: &str) -> bool {
    let tokens = tokenize(turn_text);
    ["collaborate", "sprint", "collaboration"]
        .iter()
        .any(|kw| tokens.iter().any(|t| t == kw))
}

/// Render the tier-0 plan summary, always carrying the honest memory
/// aggregate.
fn plan_summary(slots_map: &BTreeMap<String, SlotValue>, digest: &MemoryDigest) -> String {
    let project = slots_map
        .get(slots::PROJECT_TYPE)
        .map(|s| s.value.clone())
        .unwrap_or_else(|| "project".to_string());
    let mut summary = format!("Plan for {project}");
    if let Some(features) = slots_map.get(slots::KEY_FEATURES) {
        summary.push_str(&format!(" ({})", features.value));
    }
    summary.push_str(&format!("; {}", digest.render()));
    summary
}

fn classification_prompt(session: &Session, turn_text: &str, memory: &[MemoryRecord]) -> String {
    let mut prompt = format!(
        "Session phase: {}\nKnown slots:\n",
        session.phase().as_str()
    );
    if session.slots().is_empty() {
        prompt.push_str("  (none)\n");
    }
    for (key, value) in session.slots() {
        prompt.push_str(&format!("  {key} = {}\n", value.value));
    }
    if !memory.is_empty() {
        prompt.push_str("Similar past projects:\n");
        for record in memory {
            prompt.push_str(&format!(
                "  [{:.2}] {} ({})\n",
                record.score,
                record.summary,
                record.kind.as_str()
            ));
        }
    }
    prompt.push_str(&format!("User turn: {turn_text}\n"));
    prompt
}

/// Fold model-extracted slots into the deltas. The deterministic rule
/// extraction stays authoritative; model values fill only the keys the
/// rules did not catch.
fn merge_model_slots(deltas: &mut BTreeMap<String, SlotValue>, extracted: BTreeMap<String, String>) {
    for (key, value) in extracted {
        deltas.entry(key).or_insert_with(|| SlotValue::stated(value));
    }
}

/// Decode a structured reply into a decision plus any slots the model
/// extracted, enforcing payload rules the serde schema alone cannot
/// express.
fn decode_reply(
    value: serde_json::Value,
    tier: DecisionTier,
    digest: &MemoryDigest,
) -> Result<(Decision, BTreeMap<String, String>), GatewayError> {
    let reply: ClassifierReply = serde_json::from_value(value)
        .map_err(|e| GatewayError::SchemaInvalid(e.to_string()))?;

    let (kind, confidence, slots) = match reply {
        ClassifierReply::Ask {
            question,
            slots,
            confidence,
        } => (
            DecisionKind::AskClarifyingQuestion { question },
            confidence,
            slots,
        ),
        ClassifierReply::ProposePlan {
            summary,
            slots,
            confidence,
        } => (
            DecisionKind::ProposePlan {
                summary: format!("{summary}; {}", digest.render()),
            },
            confidence,
            slots,
        ),
        ClassifierReply::RecommendTeam { roles, confidence } => {
            if roles.is_empty() {
                return Err(GatewayError::SchemaInvalid(
                    "recommend_team with no roles".to_string(),
                ));
            }
            (
                DecisionKind::RecommendAgentTeam { roles },
                confidence,
                BTreeMap::new(),
            )
        }
        ClassifierReply::CreateAgents { roles, confidence } => {
            if roles.is_empty() {
                return Err(GatewayError::SchemaInvalid(
                    "create_agents with no roles".to_string(),
                ));
            }
            (
                DecisionKind::CreateAgents { roles },
                confidence,
                BTreeMap::new(),
            )
        }
        ClassifierReply::Collaborate {
            goal,
            roles,
            confidence,
        } => (
            DecisionKind::EscalateToCollaboration { goal, roles },
            confidence,
            BTreeMap::new(),
        ),
    };

    Ok((Decision::new(kind, tier, confidence), slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::memory_gateway::NoMemory;
    use async_trait::async_trait;
    use foreman_domain::MemoryKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Inference stub whose behavior is scripted per backend.
    struct ScriptedInference {
        local: Script,
        remote: Script,
        calls: AtomicUsize,
    }

    enum Script {
        Reply(serde_json::Value),
        Fail,
        /// Sleep far past any deadline
        Hang,
    }

    impl ScriptedInference {
        fn new(local: Script, remote: Script) -> Self {
            Self {
                local,
                remote,
                calls: AtomicUsize::new(0),
            }
        }

        fn script(&self, backend: &BackendId) -> &Script {
            match backend {
                BackendId::Local => &self.local,
                _ => &self.remote,
            }
        }
    }

    #[async_trait]
    impl InferenceGateway for ScriptedInference {
        async fn complete_text(&self, request: InferenceRequest) -> Result<String, GatewayError> {
            self.complete_structured(request).await.map(|v| v.to_string())
        }

        async fn complete_structured(
            &self,
            request: InferenceRequest,
        ) -> Result<serde_json::Value, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script(&request.backend) {
                Script::Reply(value) => Ok(value.clone()),
                Script::Fail => Err(GatewayError::BackendUnavailable("down".to_string())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("hang script must be cut off by the deadline")
                }
            }
        }
    }

    /// Memory stub that counts searches.
    struct CountingMemory {
        records: Vec<MemoryRecord>,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl MemoryGateway for CountingMemory {
        async fn search(&self, _query: &str, _k: usize, _min_score: f64) -> Vec<MemoryRecord> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.records.clone()
        }

        async fn upsert(&self, _record: MemoryRecord) {}
    }

    fn engine(inference: ScriptedInference) -> ClassifyTurnUseCase {
        ClassifyTurnUseCase::new(Arc::new(inference), Arc::new(NoMemory), EngineParams::default())
    }

    #[tokio::test]
    async fn test_tier0_wins_on_clear_input() {
        let engine = engine(ScriptedInference::new(Script::Fail, Script::Fail));
        let session = Session::new("s-1");
        let result = engine
            .classify(&session, "I want to build a web application for tracking fitness goals")
            .await;

        assert_eq!(result.decision.source_tier, DecisionTier::Rules);
        match &result.decision.kind {
            DecisionKind::ProposePlan { summary } => {
                assert!(summary.contains("web_application"));
                assert!(summary.contains("0 similar projects found"));
            }
            other => panic!("expected ProposePlan, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tier0_never_calls_inference() {
        let inference = Arc::new(ScriptedInference::new(Script::Fail, Script::Fail));
        let engine = ClassifyTurnUseCase::new(
            Arc::clone(&inference) as Arc<dyn InferenceGateway>,
            Arc::new(NoMemory),
            EngineParams::default(),
        );
        let session = Session::new("s-1");
        let result = engine.classify(&session, "a mobile app for notes").await;
        assert_eq!(result.decision.source_tier, DecisionTier::Rules);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schema_invalid_local_falls_to_remote() {
        let engine = engine(ScriptedInference::new(
            Script::Reply(serde_json::json!({"action": "ask"})),
            Script::Reply(serde_json::json!({
                "action": "ask",
                "question": "What stack?",
                "confidence": 0.7,
            })),
        ));
        let session = Session::new("s-1");
        let result = engine.classify(&session, "hmm, something nice").await;
        assert_eq!(result.decision.source_tier, DecisionTier::RemoteModel);
    }

    #[tokio::test]
    async fn test_model_extracted_slots_reach_the_deltas() {
        let engine = engine(ScriptedInference::new(
            Script::Reply(serde_json::json!({
                "action": "ask",
                "question": "How many people on the team?",
                "slots": {"tech_stack": "rust"},
                "confidence": 0.9,
            })),
            Script::Fail,
        ));
        let session = Session::new("s-1");
        let result = engine.classify(&session, "hmm, something nice").await;

        assert_eq!(result.decision.source_tier, DecisionTier::LocalModel);
        let delta = result
            .slot_deltas
            .get(slots::TECH_STACK)
            .expect("model-extracted slot must survive decoding");
        assert_eq!(delta.value, "rust");
        assert!(!delta.assumed);
    }

    #[tokio::test]
    async fn test_rule_extraction_beats_model_slot_on_conflict() {
        let engine = engine(ScriptedInference::new(
            Script::Reply(serde_json::json!({
                "action": "ask",
                "question": "Anything else?",
                "slots": {"tech_stack": "cobol"},
                "confidence": 0.9,
            })),
            Script::Fail,
        ));
        // Mentions rust, so the rules extract tech_stack but no project
        // type, leaving the decision itself to the local model.
        let session = Session::new("s-1");
        let result = engine.classify(&session, "hmm, rust I guess").await;

        assert_eq!(result.decision.source_tier, DecisionTier::LocalModel);
        assert_eq!(result.slot_deltas.get(slots::TECH_STACK).unwrap().value, "rust");
    }

    #[tokio::test]
    async fn test_fallback_totality_when_all_tiers_fail() {
        let engine = engine(ScriptedInference::new(Script::Fail, Script::Fail));
        let session = Session::new("s-1");
        let result = engine.classify(&session, "hmm, something nice").await;
        assert_eq!(result.decision.source_tier, DecisionTier::SafeDefault);
        assert!(matches!(
            result.decision.kind,
            DecisionKind::AskClarifyingQuestion { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounded_with_hanging_backends() {
        let engine = engine(ScriptedInference::new(Script::Hang, Script::Hang));
        let session = Session::new("s-1");
        let wall = Instant::now();
        let start = tokio::time::Instant::now();
        let result = engine.classify(&session, "hmm, something nice").await;
        let elapsed = start.elapsed();

        assert_eq!(result.decision.source_tier, DecisionTier::SafeDefault);
        // T1 + T2 plus a small constant, on virtual time
        assert!(elapsed <= Duration::from_millis(8_100), "took {elapsed:?}");
        // Sanity: virtual time means the test itself runs quickly
        assert!(wall.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_memory_searched_once_per_turn() {
        let memory = Arc::new(CountingMemory {
            records: vec![
                MemoryRecord::new("m-1", 0.9, "fitness tracker", MemoryKind::PastSession)
                    .with_outcome(true),
            ],
            searches: AtomicUsize::new(0),
        });
        let engine = ClassifyTurnUseCase::new(
            Arc::new(ScriptedInference::new(Script::Fail, Script::Fail)),
            Arc::clone(&memory) as Arc<dyn MemoryGateway>,
            EngineParams::default(),
        );
        let session = Session::new("s-1");
        let _ = engine.classify(&session, "hmm, something nice").await;
        assert_eq!(memory.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plan_summary_reports_known_success_rate() {
        let memory = Arc::new(CountingMemory {
            records: vec![
                MemoryRecord::new("m-1", 0.9, "fitness tracker", MemoryKind::PastSession)
                    .with_outcome(true),
                MemoryRecord::new("m-2", 0.8, "meal planner", MemoryKind::PastSession)
                    .with_outcome(true),
            ],
            searches: AtomicUsize::new(0),
        });
        let engine = ClassifyTurnUseCase::new(
            Arc::new(ScriptedInference::new(Script::Fail, Script::Fail)),
            memory,
            EngineParams::default(),
        );
        let session = Session::new("s-1");
        let result = engine
            .classify(&session, "a web application for tracking fitness goals")
            .await;
        match &result.decision.kind {
            DecisionKind::ProposePlan { summary } => {
                assert!(summary.contains("2 similar projects found, success rate 100%"));
            }
            other => panic!("expected ProposePlan, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_collaboration_keyword_in_do_phase() {
        let engine = engine(ScriptedInference::new(Script::Fail, Script::Fail));
        let mut session = Session::new("s-1");
        session.set_phase(foreman_domain::PdcaPhase::DoActive);
        let result = engine.classify(&session, "plan sprint 1 together").await;
        assert!(matches!(
            result.decision.kind,
            DecisionKind::EscalateToCollaboration { .. }
        ));
    }
}
