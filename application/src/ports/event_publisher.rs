//! Event publisher port
//!
//! Status and progress events for external observers (dashboards).
//! Publishing is fire-and-forget: the core never blocks or fails because
//! an observer is slow or absent.

use foreman_domain::{DecisionTier, PdcaPhase, Termination};
use serde::Serialize;

/// Events the coordination core publishes while working
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    DecisionMade {
        session_id: String,
        kind: String,
        tier: DecisionTier,
        confidence: f64,
    },
    PhaseChanged {
        session_id: String,
        phase: PdcaPhase,
    },
    AgentsCreated {
        session_id: String,
        created: Vec<String>,
        failed: Vec<String>,
    },
    CollaborationRound {
        collaboration_id: String,
        agent_id: String,
        round: u32,
        /// Short digest of the contribution, not the full content
        digest: String,
    },
    CollaborationFinished {
        collaboration_id: String,
        termination: Termination,
        rounds: u32,
    },
}

impl CoordinatorEvent {
    /// Topic the event is published under
    pub fn topic(&self) -> &'static str {
        match self {
            CoordinatorEvent::DecisionMade { .. } => "decisions",
            CoordinatorEvent::PhaseChanged { .. } => "sessions",
            CoordinatorEvent::AgentsCreated { .. } => "roster",
            CoordinatorEvent::CollaborationRound { .. }
            | CoordinatorEvent::CollaborationFinished { .. } => "collaboration",
        }
    }
}

/// Fire-and-forget event sink
///
/// Implementations must not block and must swallow their own failures.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: CoordinatorEvent);
}

/// No-op publisher for when nobody is watching
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: CoordinatorEvent) {}
}

/// Truncate collaboration content to a short digest for events.
pub fn content_digest(content: &str) -> String {
    const DIGEST_LEN: usize = 80;
    let line = content.lines().next().unwrap_or_default();
    let mut digest: String = line.chars().take(DIGEST_LEN).collect();
    if line.chars().count() > DIGEST_LEN || content.lines().count() > 1 {
        digest.push('…');
    }
    digest
}
