//! Memory and preference store traits.
//!
//! Long-term semantic memory: durable (user, summary, embedding, metadata)
//! tuples queried by nearest-neighbor similarity, plus a per-user,
//! per-category preference map. Both share the persistent store with the
//! session subsystem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// A durable, append-only memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID for this memory
    pub id: String,

    /// The user this memory belongs to
    pub user_id: String,

    /// The message this summary was derived from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// The summary text
    pub summary: String,

    /// Embedding vector (stored as blob in the DB)
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,

    /// Arbitrary metadata (trip id, detected topics, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// When this memory was created
    pub created_at: DateTime<Utc>,

    /// Similarity to the query (set by retrieval operations)
    #[serde(default)]
    pub similarity: f32,
}

impl MemoryRecord {
    /// Create a new record with a fresh id and the current timestamp.
    pub fn new(
        user_id: impl Into<String>,
        summary: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            message_id: None,
            summary: summary.into(),
            embedding: None,
            metadata,
            created_at: Utc::now(),
            similarity: 0.0,
        }
    }
}

/// Durable storage for memory records.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist a new memory record. Records are append-only.
    async fn insert_memory(&self, record: MemoryRecord)
        -> std::result::Result<String, StorageError>;

    /// All memory records for a user (embedding included), newest first.
    async fn memories_for_user(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<MemoryRecord>, StorageError>;

    /// Delete records older than the cutoff; returns how many were removed.
    /// Maintenance operation — never invoked by the agent loop.
    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> std::result::Result<u64, StorageError>;
}

/// Durable storage for per-user preferences.
///
/// The whole preferences object is keyed by `user_id` and upserted with
/// insert-or-replace-on-conflict semantics; merging happens in the service
/// layer.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// The full category→data map for a user, or `None` if absent.
    async fn preferences_for_user(
        &self,
        user_id: &str,
    ) -> std::result::Result<Option<serde_json::Map<String, serde_json::Value>>, StorageError>;

    /// Upsert the whole preferences object for a user.
    async fn upsert_preferences(
        &self,
        user_id: &str,
        preferences: &serde_json::Map<String, serde_json::Value>,
        updated_at: DateTime<Utc>,
    ) -> std::result::Result<(), StorageError>;
}
