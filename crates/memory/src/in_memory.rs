//! In-process store for tests and ephemeral deployments.
//!
//! Implements the same trait surface as [`crate::SqliteStore`] over plain
//! `Mutex`-guarded maps. Nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use waypoint_core::error::StorageError;
use waypoint_core::memory::{MemoryRecord, MemoryStore, PreferenceStore};
use waypoint_core::message::Message;
use waypoint_core::session::{Session, SessionStore};

#[derive(Default)]
struct Inner {
    sessions: Vec<Session>,
    // session_id -> messages in append order
    messages: HashMap<String, Vec<Message>>,
    memories: Vec<MemoryRecord>,
    preferences: HashMap<String, serde_json::Map<String, serde_json::Value>>,
}

/// Volatile store backed by in-process maps.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn latest_session(
        &self,
        user_id: Option<&str>,
        session_token: &str,
    ) -> Result<Option<Session>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .rev()
            .find(|s| s.session_token == session_token && s.user_id.as_deref() == user_id)
            .cloned())
    }

    async fn latest_session_by_token(
        &self,
        session_token: &str,
    ) -> Result<Option<Session>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .rev()
            .find(|s| s.session_token == session_token)
            .cloned())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.push(session.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let inner = self.inner.lock().unwrap();
        let messages = inner.messages.get(session_id).cloned().unwrap_or_default();
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: &Message,
    ) -> Result<String, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let mut message = message.clone();
        if message.id.is_empty() {
            message.id = Uuid::new_v4().to_string();
        }
        let id = message.id.clone();
        inner
            .messages
            .entry(session_id.to_string())
            .or_default()
            .push(message);
        Ok(id)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn insert_memory(&self, mut record: MemoryRecord) -> Result<String, StorageError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        let mut inner = self.inner.lock().unwrap();
        inner.memories.push(record);
        Ok(id)
    }

    async fn memories_for_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, StorageError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<MemoryRecord> = inner
            .memories
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.memories.len();
        inner.memories.retain(|r| r.created_at >= cutoff);
        Ok((before - inner.memories.len()) as u64)
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn preferences_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<serde_json::Map<String, serde_json::Value>>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.preferences.get(user_id).cloned())
    }

    async fn upsert_preferences(
        &self,
        user_id: &str,
        preferences: &serde_json::Map<String, serde_json::Value>,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .preferences
            .insert(user_id.to_string(), preferences.clone());
        Ok(())
    }
}
