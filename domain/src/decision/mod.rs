//! Decision types produced by the tiered classification chain
//!
//! A [`Decision`] is the single, schema-valid output of classifying one user
//! turn. It always records which tier produced it and how confident that
//! tier was, so every conversational action is auditable after the fact.

use serde::{Deserialize, Serialize};

/// The fallback tier that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionTier {
    /// Tier 0: deterministic keyword rules
    Rules,
    /// Tier 1: local model inference
    LocalModel,
    /// Tier 2: remote model inference with memory context
    RemoteModel,
    /// Tier 3: deterministic safe default, cannot fail
    SafeDefault,
}

impl DecisionTier {
    pub fn as_str(&self) -> &str {
        match self {
            DecisionTier::Rules => "rules",
            DecisionTier::LocalModel => "local_model",
            DecisionTier::RemoteModel => "remote_model",
            DecisionTier::SafeDefault => "safe_default",
        }
    }
}

impl std::fmt::Display for DecisionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the coordinator decided to do with a user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionKind {
    /// Ask the user a clarifying question and keep gathering requirements
    AskClarifyingQuestion { question: String },
    /// Propose a project plan summary for the user to confirm
    ProposePlan { summary: String },
    /// Suggest a team of agent roles without creating anything
    RecommendAgentTeam { roles: Vec<String> },
    /// Create agent instances for the named roles
    CreateAgents { roles: Vec<String> },
    /// Run a bounded multi-agent collaboration toward a goal
    EscalateToCollaboration { goal: String, roles: Vec<String> },
    /// Nothing better was possible; carries the reason
    Fallback { reason: String },
}

impl DecisionKind {
    /// Short tag for logs and events
    pub fn as_str(&self) -> &str {
        match self {
            DecisionKind::AskClarifyingQuestion { .. } => "ask_clarifying_question",
            DecisionKind::ProposePlan { .. } => "propose_plan",
            DecisionKind::RecommendAgentTeam { .. } => "recommend_agent_team",
            DecisionKind::CreateAgents { .. } => "create_agents",
            DecisionKind::EscalateToCollaboration { .. } => "escalate_to_collaboration",
            DecisionKind::Fallback { .. } => "fallback",
        }
    }

    /// Whether applying this decision requires an explicit confirmatory
    /// turn from the user before the session may change phase.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            DecisionKind::ProposePlan { .. } | DecisionKind::RecommendAgentTeam { .. }
        )
    }
}

/// A classified decision with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub kind: DecisionKind,
    /// Which tier of the fallback chain produced this decision
    pub source_tier: DecisionTier,
    /// Confidence in [0, 1], clamped on construction
    pub confidence: f64,
}

impl Decision {
    pub fn new(kind: DecisionKind, source_tier: DecisionTier, confidence: f64) -> Self {
        Self {
            kind,
            source_tier,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The generic, context-free safe default. This constructor is total:
    /// it allocates nothing fallible and consults no backend.
    pub fn safe_default() -> Self {
        Self::new(
            DecisionKind::AskClarifyingQuestion {
                question: "Could you tell me more about what you want to build?".to_string(),
            },
            DecisionTier::SafeDefault,
            1.0,
        )
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let d = Decision::new(
            DecisionKind::Fallback {
                reason: "test".to_string(),
            },
            DecisionTier::Rules,
            1.7,
        );
        assert_eq!(d.confidence, 1.0);

        let d = Decision::new(
            DecisionKind::Fallback {
                reason: "test".to_string(),
            },
            DecisionTier::Rules,
            -0.3,
        );
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn test_safe_default_is_clarifying_question() {
        let d = Decision::safe_default();
        assert_eq!(d.source_tier, DecisionTier::SafeDefault);
        assert!(matches!(
            d.kind,
            DecisionKind::AskClarifyingQuestion { .. }
        ));
    }

    #[test]
    fn test_requires_confirmation() {
        assert!(
            DecisionKind::ProposePlan {
                summary: "plan".to_string(),
            }
            .requires_confirmation()
        );
        assert!(
            !DecisionKind::CreateAgents {
                roles: vec!["developer".to_string()],
            }
            .requires_confirmation()
        );
    }

    #[test]
    fn test_kind_serde_tagging() {
        let kind = DecisionKind::EscalateToCollaboration {
            goal: "sprint 1 plan".to_string(),
            roles: vec!["architect".to_string()],
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "escalate_to_collaboration");
        assert_eq!(json["goal"], "sprint 1 plan");
    }
}
