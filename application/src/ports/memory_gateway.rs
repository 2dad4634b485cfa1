//! Memory gateway port
//!
//! Similarity search over past sessions and knowledge items. The gateway
//! degrades to an empty result set when the backing store is unavailable;
//! it never surfaces an error to the coordination core.

use async_trait::async_trait;
use foreman_domain::MemoryRecord;

/// Gateway for similarity search over historical context
#[async_trait]
pub trait MemoryGateway: Send + Sync {
    /// Return up to `k` records scoring at least `min_score` against the
    /// query. Unavailability degrades to an empty vector, never an error.
    async fn search(&self, query: &str, k: usize, min_score: f64) -> Vec<MemoryRecord>;

    /// Store a record for future retrieval. Best-effort; failures are
    /// logged by the adapter and swallowed.
    async fn upsert(&self, record: MemoryRecord);
}

/// Memory gateway that remembers nothing. Searches return empty and
/// upserts are dropped.
pub struct NoMemory;

#[async_trait]
impl MemoryGateway for NoMemory {
    async fn search(&self, _query: &str, _k: usize, _min_score: f64) -> Vec<MemoryRecord> {
        Vec::new()
    }

    async fn upsert(&self, _record: MemoryRecord) {}
}
