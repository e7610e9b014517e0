//! Semantic conversation memory.
//!
//! Writes summaries with an embedding attached; reads rank the user's
//! records by cosine similarity against an embedded query. Both paths are
//! fail-soft: a dead embedder or a storage hiccup degrades a turn to
//! "no memories", it never fails it.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use waypoint_core::error::StorageError;
use waypoint_core::memory::{MemoryRecord, MemoryStore};
use waypoint_core::provider::Embedder;

use crate::vector::rank_by_similarity;

/// Long-term memory over an embedding provider and a durable store.
pub struct ConversationMemory {
    store: Arc<dyn MemoryStore>,
    embedder: Arc<dyn Embedder>,
    recall_limit: usize,
    min_similarity: f32,
}

impl ConversationMemory {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedder: Arc<dyn Embedder>,
        recall_limit: usize,
        min_similarity: f32,
    ) -> Self {
        Self {
            store,
            embedder,
            recall_limit,
            min_similarity,
        }
    }

    /// Store a summary for later recall. Returns the new record's id, or
    /// `None` when the embedding or the write failed; the caller treats
    /// both the same way and moves on.
    pub async fn remember(
        &self,
        user_id: &str,
        message_id: Option<String>,
        summary: &str,
        metadata: serde_json::Value,
    ) -> Option<String> {
        let embedding = match self.embedder.embed(summary).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Skipping memory write, embedder unavailable: {e}");
                return None;
            }
        };

        let mut record = MemoryRecord::new(user_id, summary, metadata);
        record.message_id = message_id;
        record.embedding = Some(embedding);

        match self.store.insert_memory(record).await {
            Ok(id) => {
                debug!("Remembered summary for {user_id} as {id}");
                Some(id)
            }
            Err(e) => {
                warn!("Skipping memory write, store failed: {e}");
                None
            }
        }
    }

    /// The user's most relevant memories for a query, best match first.
    /// At most `recall_limit` records, each at or above `min_similarity`.
    /// Never fails: any error along the way yields an empty list.
    pub async fn recall(&self, user_id: &str, query: &str) -> Vec<MemoryRecord> {
        let query_embedding = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Recall degraded to empty, embedder unavailable: {e}");
                return Vec::new();
            }
        };

        let records = match self.store.memories_for_user(user_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Recall degraded to empty, store failed: {e}");
                return Vec::new();
            }
        };

        rank_by_similarity(
            &records,
            &query_embedding,
            self.recall_limit,
            self.min_similarity,
        )
    }

    /// Delete memories older than `retention_days`. Maintenance entry
    /// point, errors propagate to the operator.
    pub async fn purge_older_than(&self, retention_days: i64) -> Result<u64, StorageError> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        self.store.purge_older_than(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use waypoint_core::error::EmbedderError;

    use crate::in_memory::InMemoryStore;

    /// Maps known phrases onto fixed unit-ish vectors.
    struct FixtureEmbedder;

    #[async_trait]
    impl Embedder for FixtureEmbedder {
        fn name(&self) -> &str {
            "fixture"
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
            let v = match text {
                t if t.contains("hotel") => vec![1.0, 0.0, 0.0],
                t if t.contains("food") => vec![0.0, 1.0, 0.0],
                t if t.contains("hiking") => vec![0.9, 0.1, 0.0],
                _ => vec![0.0, 0.0, 1.0],
            };
            Ok(v)
        }
    }

    struct DeadEmbedder;

    #[async_trait]
    impl Embedder for DeadEmbedder {
        fn name(&self) -> &str {
            "dead"
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedderError> {
            Err(EmbedderError::Unavailable("connection refused".into()))
        }
    }

    fn memory_with(embedder: Arc<dyn Embedder>) -> (ConversationMemory, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let memory = ConversationMemory::new(store.clone(), embedder, 5, 0.5);
        (memory, store)
    }

    #[tokio::test]
    async fn remember_then_recall_ranks_by_similarity() {
        let (memory, _) = memory_with(Arc::new(FixtureEmbedder));

        memory
            .remember("user_1", None, "Prefers boutique hotel stays", serde_json::json!({}))
            .await
            .unwrap();
        memory
            .remember("user_1", None, "Loves street food tours", serde_json::json!({}))
            .await
            .unwrap();
        memory
            .remember("user_1", None, "Enjoys hiking in the alps", serde_json::json!({}))
            .await
            .unwrap();

        let results = memory.recall("user_1", "find a hotel in Lyon").await;
        assert_eq!(results.len(), 2);
        assert!(results[0].summary.contains("hotel"));
        assert!(results[1].summary.contains("hiking"));
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[tokio::test]
    async fn recall_respects_threshold() {
        let (memory, _) = memory_with(Arc::new(FixtureEmbedder));
        memory
            .remember("user_1", None, "Loves street food tours", serde_json::json!({}))
            .await
            .unwrap();

        // "hotel" query is orthogonal to the food memory
        let results = memory.recall("user_1", "hotel recommendations").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn dead_embedder_makes_remember_a_noop() {
        let (memory, store) = memory_with(Arc::new(DeadEmbedder));
        let id = memory
            .remember("user_1", None, "Prefers aisle seats", serde_json::json!({}))
            .await;
        assert!(id.is_none());
        assert!(store.memories_for_user("user_1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dead_embedder_makes_recall_empty() {
        let (memory, _) = memory_with(Arc::new(DeadEmbedder));
        let results = memory.recall("user_1", "anything").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn purge_uses_retention_window() {
        let store = Arc::new(InMemoryStore::new());
        let memory =
            ConversationMemory::new(store.clone(), Arc::new(FixtureEmbedder), 5, 0.5);

        let mut stale = MemoryRecord::new("user_1", "stale hotel note", serde_json::json!({}));
        stale.created_at = Utc::now() - Duration::days(120);
        store.insert_memory(stale).await.unwrap();
        memory
            .remember("user_1", None, "fresh hotel note", serde_json::json!({}))
            .await
            .unwrap();

        let purged = memory.purge_older_than(90).await.unwrap();
        assert_eq!(purged, 1);
    }
}
