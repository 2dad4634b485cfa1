//! Token-overlap similarity store
//!
//! In-process memory of past sessions and knowledge items, scored by
//! Jaccard overlap between the query tokens and each entry's text. An
//! optional JSONL journal replays entries at startup and appends new ones,
//! so memory survives restarts. Journal trouble degrades the store, never
//! the caller: a failed replay starts empty and a failed append is logged.

use async_trait::async_trait;
use foreman_application::ports::memory_gateway::MemoryGateway;
use foreman_domain::{MemoryKind, MemoryRecord, tokenize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// One remembered item, stored with its full text for scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    /// Text the similarity score is computed against
    pub text: String,
    /// Short form surfaced to the decision engine
    pub summary: String,
    pub kind: MemoryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<bool>,
}

impl MemoryEntry {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        summary: impl Into<String>,
        kind: MemoryKind,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
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

/// Memory gateway backed by token-overlap scoring over local entries
pub struct TokenOverlapMemoryStore {
    entries: Mutex<Vec<MemoryEntry>>,
    journal: Option<PathBuf>,
}

impl TokenOverlapMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// Open a store journaled at `path`. Existing lines are replayed,
    /// later entries with the same id replacing earlier ones. Unreadable
    /// lines are skipped.
    pub fn with_journal(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut entries: Vec<MemoryEntry> = Vec::new();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create memory journal directory {}: {}", parent.display(), e);
        }

        match File::open(path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<MemoryEntry>(&line) {
                        Ok(entry) => {
                            entries.retain(|e| e.id != entry.id);
                            entries.push(entry);
                        }
                        Err(e) => warn!("Skipping unreadable memory journal line: {e}"),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not read memory journal {}: {}", path.display(), e),
        }

        debug!(entries = entries.len(), "memory store opened");
        Self {
            entries: Mutex::new(entries),
            journal: Some(path.to_path_buf()),
        }
    }

    /// Add an entry directly, bypassing the gateway surface. Used for
    /// seeding at startup and in tests.
    pub fn seed(&self, entry: MemoryEntry) {
        self.append_journal(&entry);
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|e| e.id != entry.id);
            entries.push(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append_journal(&self, entry: &MemoryEntry) {
        let Some(path) = &self.journal else { return };
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open memory journal {}: {}", path.display(), e);
                return;
            }
        };
        let Ok(line) = serde_json::to_string(entry) else {
            return;
        };
        let mut writer = BufWriter::new(file);
        let _ = writeln!(writer, "{line}");
        let _ = writer.flush();
    }
}

impl Default for TokenOverlapMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Jaccard overlap between two token sets, in [0, 1]
fn overlap_score(query: &BTreeSet<String>, text: &str) -> f64 {
    let entry_tokens: BTreeSet<String> = tokenize(text).into_iter().collect();
    if query.is_empty() || entry_tokens.is_empty() {
        return 0.0;
    }
    let shared = query.intersection(&entry_tokens).count();
    let union = query.union(&entry_tokens).count();
    shared as f64 / union as f64
}

#[async_trait]
impl MemoryGateway for TokenOverlapMemoryStore {
    async fn search(&self, query: &str, k: usize, min_score: f64) -> Vec<MemoryRecord> {
        let query_tokens: BTreeSet<String> = tokenize(query).into_iter().collect();
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Memory store unavailable, returning no matches: {e}");
                return Vec::new();
            }
        };

        let mut hits: Vec<MemoryRecord> = entries
            .iter()
            .filter_map(|entry| {
                let score = overlap_score(&query_tokens, &entry.text);
                if score < min_score {
                    return None;
                }
                let mut record =
                    MemoryRecord::new(entry.id.clone(), score, entry.summary.clone(), entry.kind);
                if let Some(succeeded) = entry.succeeded {
                    record = record.with_outcome(succeeded);
                }
                Some(record)
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }

    async fn upsert(&self, record: MemoryRecord) {
        let mut entry = MemoryEntry::new(
            record.id,
            record.summary.clone(),
            record.summary,
            record.kind,
        );
        entry.succeeded = record.succeeded;
        self.seed(entry);
    }
}
