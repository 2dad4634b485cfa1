//! Memory records retrieved from similarity search
//!
//! Read-only to the coordination core; produced by the memory gateway.
//! The [`MemoryDigest`] aggregate is computed purely from returned records
//! and never fabricates history when the result set is empty.

use serde::{Deserialize, Serialize};

/// Kind of a retrieved memory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    PastSession,
    KnowledgeItem,
}

impl MemoryKind {
    pub fn as_str(&self) -> &str {
        match self {
            MemoryKind::PastSession => "past_session",
            MemoryKind::KnowledgeItem => "knowledge_item",
        }
    }
}

/// One similarity-search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    /// Similarity score in [0, 1]
    pub score: f64,
    pub summary: String,
    pub kind: MemoryKind,
    /// Whether the remembered project ended well, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<bool>,
}

impl MemoryRecord {
    pub fn new(
        id: impl Into<String>,
        score: f64,
        summary: impl Into<String>,
        kind: MemoryKind,
    ) -> Self {
        Self {
            id: id.into(),
            score: score.clamp(0.0, 1.0),
            summary: summary.into(),
            kind,
            succeeded: None,
        }
    }

    pub fn with_outcome(mut self, succeeded: bool) -> Self {
        self.succeeded = Some(succeeded);
        self
    }
}

/// Aggregate over a turn's retrieved records, used to enrich plan
/// summaries with honest historical context.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDigest {
    pub similar_projects: usize,
    pub success_rate: Option<f64>,
}

impl MemoryDigest {
    /// Compute the digest from retrieved records. Only past sessions count
    /// as "similar projects"; the success rate is present only when at
    /// least one of them carries a known outcome.
    pub fn from_records(records: &[MemoryRecord]) -> Self {
        let past: Vec<&MemoryRecord> = records
            .iter()
            .filter(|r| r.kind == MemoryKind::PastSession)
            .collect();

        let with_outcome: Vec<bool> = past.iter().filter_map(|r| r.succeeded).collect();
        let success_rate = if with_outcome.is_empty() {
            None
        } else {
            let wins = with_outcome.iter().filter(|s| **s).count();
            Some(wins as f64 / with_outcome.len() as f64)
        };

        Self {
            similar_projects: past.len(),
            success_rate,
        }
    }

    /// Render the digest for a plan summary. An empty result set reads
    /// "0 similar projects found", never a templated claim of success.
    pub fn render(&self) -> String {
        match (self.similar_projects, self.success_rate) {
            (0, _) => "0 similar projects found".to_string(),
            (n, None) => format!("{n} similar projects found"),
            (n, Some(rate)) => format!(
                "{n} similar projects found, success rate {:.0}%",
                rate * 100.0
            ),
        }
    }
}
