//! SQLite persistent store.
//!
//! One database file holds all durable state:
//! - `sessions`  — conversation identities
//! - `messages`  — per-session history (tool calls/results as JSON)
//! - `memories`  — append-only summaries with embedding blobs
//! - `preferences` — one row per user, category map as JSON
//!
//! Integer rowids (`iid`) provide creation order for messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use waypoint_core::error::StorageError;
use waypoint_core::memory::{MemoryRecord, MemoryStore, PreferenceStore};
use waypoint_core::message::Message;
use waypoint_core::session::{Session, SessionStore};

/// A production SQLite store for sessions, messages, memories, preferences.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store from a path. The database and all tables are
    /// created automatically. Pass `"sqlite::memory:"` for an ephemeral
    /// in-process database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StorageError::Connection(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id            TEXT PRIMARY KEY,
                user_id       TEXT,
                session_token TEXT NOT NULL,
                trip_id       TEXT,
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Migration(format!("sessions table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_token ON sessions(session_token, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Migration(format!("sessions index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                session_id   TEXT NOT NULL REFERENCES sessions(id),
                role         TEXT NOT NULL,
                content      TEXT NOT NULL,
                tool_calls   TEXT NOT NULL DEFAULT '[]',
                tool_results TEXT NOT NULL DEFAULT '[]',
                context      TEXT NOT NULL DEFAULT 'null',
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Migration(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Migration(format!("messages index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT UNIQUE NOT NULL,
                user_id    TEXT NOT NULL,
                message_id TEXT,
                summary    TEXT NOT NULL,
                embedding  BLOB,
                metadata   TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Migration(format!("memories table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Migration(format!("memories index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                user_id    TEXT PRIMARY KEY,
                data       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Migration(format!("preferences table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session, StorageError> {
        Ok(Session {
            id: row
                .try_get("id")
                .map_err(|e| StorageError::Query(format!("id column: {e}")))?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| StorageError::Query(format!("user_id column: {e}")))?,
            session_token: row
                .try_get("session_token")
                .map_err(|e| StorageError::Query(format!("session_token column: {e}")))?,
            trip_id: row
                .try_get("trip_id")
                .map_err(|e| StorageError::Query(format!("trip_id column: {e}")))?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, StorageError> {
        let tool_calls_json: String = row
            .try_get("tool_calls")
            .map_err(|e| StorageError::Query(format!("tool_calls column: {e}")))?;
        let tool_results_json: String = row
            .try_get("tool_results")
            .map_err(|e| StorageError::Query(format!("tool_results column: {e}")))?;
        let context_json: String = row
            .try_get("context")
            .map_err(|e| StorageError::Query(format!("context column: {e}")))?;
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StorageError::Query(format!("role column: {e}")))?;

        let role = serde_json::from_value(serde_json::Value::String(role_str))
            .map_err(|e| StorageError::Query(format!("unknown role: {e}")))?;

        Ok(Message {
            id: row
                .try_get("id")
                .map_err(|e| StorageError::Query(format!("id column: {e}")))?,
            role,
            content: row
                .try_get("content")
                .map_err(|e| StorageError::Query(format!("content column: {e}")))?,
            tool_calls: serde_json::from_str(&tool_calls_json).unwrap_or_default(),
            tool_results: serde_json::from_str(&tool_results_json).unwrap_or_default(),
            context: serde_json::from_str(&context_json).unwrap_or(serde_json::Value::Null),
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    fn row_to_memory(row: &sqlx::sqlite::SqliteRow) -> Result<MemoryRecord, StorageError> {
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| StorageError::Query(format!("metadata column: {e}")))?;

        let embedding: Option<Vec<u8>> = row
            .try_get("embedding")
            .map_err(|e| StorageError::Query(format!("embedding column: {e}")))?;
        let embedding_vec = embedding.map(|blob| {
            blob.chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect()
        });

        Ok(MemoryRecord {
            id: row
                .try_get("id")
                .map_err(|e| StorageError::Query(format!("id column: {e}")))?,
            user_id: row
                .try_get("user_id")
                .map_err(|e| StorageError::Query(format!("user_id column: {e}")))?,
            message_id: row
                .try_get("message_id")
                .map_err(|e| StorageError::Query(format!("message_id column: {e}")))?,
            summary: row
                .try_get("summary")
                .map_err(|e| StorageError::Query(format!("summary column: {e}")))?,
            embedding: embedding_vec,
            metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
            created_at: parse_timestamp(row, "created_at")?,
            similarity: 0.0,
        })
    }

    /// Serialize an embedding vector to little-endian bytes.
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }
}

fn parse_timestamp(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, StorageError> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| StorageError::Query(format!("{column} column: {e}")))?;
    Ok(DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now()))
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn latest_session(
        &self,
        user_id: Option<&str>,
        session_token: &str,
    ) -> Result<Option<Session>, StorageError> {
        // `IS` gives null-safe equality: an anonymous session is found by
        // (NULL, token) just as reliably as an authenticated one.
        let row = sqlx::query(
            r#"
            SELECT * FROM sessions
            WHERE session_token = ?1 AND user_id IS ?2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(session_token)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(format!("session lookup: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn latest_session_by_token(
        &self,
        session_token: &str,
    ) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM sessions
            WHERE session_token = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(format!("session by token: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, session_token, trip_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.session_token)
        .bind(&session.trip_id)
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(format!("session insert: {e}")))?;

        debug!(session_id = %session.id, "Created session");
        Ok(())
    }

    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE session_id = ?1
            ORDER BY iid DESC
            LIMIT ?2
            "#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(format!("recent messages: {e}")))?;

        // Fetched newest-first; callers want oldest-to-newest.
        let mut messages: Vec<Message> = rows
            .iter()
            .map(Self::row_to_message)
            .collect::<Result<_, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: &Message,
    ) -> Result<String, StorageError> {
        let id = if message.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            message.id.clone()
        };

        let tool_calls = serde_json::to_string(&message.tool_calls)
            .map_err(|e| StorageError::Write(format!("tool_calls serialization: {e}")))?;
        let tool_results = serde_json::to_string(&message.tool_results)
            .map_err(|e| StorageError::Write(format!("tool_results serialization: {e}")))?;
        let context = serde_json::to_string(&message.context)
            .map_err(|e| StorageError::Write(format!("context serialization: {e}")))?;
        let role = serde_json::to_value(message.role)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| "user".into());

        sqlx::query(
            r#"
            INSERT INTO messages (id, session_id, role, content, tool_calls, tool_results, context, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(session_id)
        .bind(&role)
        .bind(&message.content)
        .bind(&tool_calls)
        .bind(&tool_results)
        .bind(&context)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(format!("message insert: {e}")))?;

        Ok(id)
    }
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn insert_memory(&self, mut record: MemoryRecord) -> Result<String, StorageError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        let metadata = serde_json::to_string(&record.metadata)
            .map_err(|e| StorageError::Write(format!("metadata serialization: {e}")))?;
        let embedding_blob: Option<Vec<u8>> =
            record.embedding.as_deref().map(Self::embedding_to_blob);

        sqlx::query(
            r#"
            INSERT INTO memories (id, user_id, message_id, summary, embedding, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.message_id)
        .bind(&record.summary)
        .bind(embedding_blob.as_deref())
        .bind(&metadata)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(format!("memory insert: {e}")))?;

        debug!("Stored memory {id}");
        Ok(id)
    }

    async fn memories_for_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM memories WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(format!("memories for user: {e}")))?;

        rows.iter().map(Self::row_to_memory).collect()
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM memories WHERE created_at < ?1")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Write(format!("memory purge: {e}")))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PreferenceStore for SqliteStore {
    async fn preferences_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<serde_json::Map<String, serde_json::Value>>, StorageError> {
        let row = sqlx::query("SELECT data FROM preferences WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("preferences lookup: {e}")))?;

        match row {
            Some(r) => {
                let data: String = r
                    .try_get("data")
                    .map_err(|e| StorageError::Query(format!("data column: {e}")))?;
                let map = serde_json::from_str(&data)
                    .map_err(|e| StorageError::Query(format!("preferences parse: {e}")))?;
                Ok(Some(map))
            }
            None => Ok(None),
        }
    }

    async fn upsert_preferences(
        &self,
        user_id: &str,
        preferences: &serde_json::Map<String, serde_json::Value>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_string(preferences)
            .map_err(|e| StorageError::Write(format!("preferences serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO preferences (user_id, data, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&data)
        .bind(updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(format!("preferences upsert: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::message::ToolCallRecord;
    use waypoint_core::tool::ToolResult;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn session_round_trip() {
        let db = test_store().await;
        let session = Session::new(Some("user_1".into()), "tok_a", None);
        db.create_session(&session).await.unwrap();

        let found = db
            .latest_session(Some("user_1"), "tok_a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.user_id.as_deref(), Some("user_1"));
    }

    #[tokio::test]
    async fn null_safe_session_lookup() {
        let db = test_store().await;
        let anon = Session::new(None, "tok_anon", None);
        db.create_session(&anon).await.unwrap();

        // Anonymous session is found with user_id = None
        let found = db.latest_session(None, "tok_anon").await.unwrap().unwrap();
        assert_eq!(found.id, anon.id);

        // ...but not when asking for an authenticated user
        let miss = db.latest_session(Some("user_1"), "tok_anon").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn latest_session_wins() {
        let db = test_store().await;
        let mut first = Session::new(None, "tok_b", None);
        first.created_at = Utc::now() - chrono::Duration::hours(1);
        db.create_session(&first).await.unwrap();

        let second = Session::new(None, "tok_b", None);
        db.create_session(&second).await.unwrap();

        let found = db.latest_session(None, "tok_b").await.unwrap().unwrap();
        assert_eq!(found.id, second.id);

        let by_token = db
            .latest_session_by_token("tok_b")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_token.id, second.id);
    }

    #[tokio::test]
    async fn messages_ordered_and_bounded() {
        let db = test_store().await;
        let session = Session::new(None, "tok_c", None);
        db.create_session(&session).await.unwrap();

        for i in 0..15 {
            db.append_message(&session.id, &Message::user(format!("message {i}")))
                .await
                .unwrap();
        }

        let recent = db.recent_messages(&session.id, 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        // Oldest-to-newest among the most recent 10
        assert_eq!(recent[0].content, "message 5");
        assert_eq!(recent[9].content, "message 14");
    }

    #[tokio::test]
    async fn message_tool_fields_round_trip() {
        let db = test_store().await;
        let session = Session::new(None, "tok_d", None);
        db.create_session(&session).await.unwrap();

        let mut msg = Message::assistant_with_calls(
            "Checking weather",
            vec![ToolCallRecord {
                id: "call_1".into(),
                name: "check_weather".into(),
                arguments: r#"{"location":"Lyon, France"}"#.into(),
            }],
        );
        msg.tool_results = vec![ToolResult {
            call_id: "call_1".into(),
            success: true,
            output: "Sunny, 24°C".into(),
            data: None,
        }];
        msg = msg.with_context(serde_json::json!({"trip_id": null}));

        db.append_message(&session.id, &msg).await.unwrap();

        let recent = db.recent_messages(&session.id, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].tool_calls.len(), 1);
        assert_eq!(recent[0].tool_calls[0].name, "check_weather");
        assert_eq!(recent[0].tool_results.len(), 1);
        assert!(recent[0].tool_results[0].success);
    }

    #[tokio::test]
    async fn memory_round_trip_with_embedding() {
        let db = test_store().await;
        let mut record =
            MemoryRecord::new("user_1", "Prefers boutique hotels", serde_json::json!({}));
        record.embedding = Some(vec![0.1, 0.2, 0.3, 0.4]);
        let id = db.insert_memory(record).await.unwrap();
        assert!(!id.is_empty());

        let records = db.memories_for_user("user_1").await.unwrap();
        assert_eq!(records.len(), 1);
        let emb = records[0].embedding.as_ref().unwrap();
        assert_eq!(emb.len(), 4);
        assert!((emb[0] - 0.1).abs() < 1e-6);
        assert!((emb[3] - 0.4).abs() < 1e-6);
    }

    #[tokio::test]
    async fn memories_scoped_by_user() {
        let db = test_store().await;
        db.insert_memory(MemoryRecord::new("user_1", "Likes trains", serde_json::json!({})))
            .await
            .unwrap();
        db.insert_memory(MemoryRecord::new("user_2", "Likes planes", serde_json::json!({})))
            .await
            .unwrap();

        let records = db.memories_for_user("user_1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].summary, "Likes trains");
    }

    #[tokio::test]
    async fn purge_reports_count() {
        let db = test_store().await;
        let mut old = MemoryRecord::new("user_1", "Ancient trip", serde_json::json!({}));
        old.created_at = Utc::now() - chrono::Duration::days(100);
        db.insert_memory(old).await.unwrap();
        db.insert_memory(MemoryRecord::new("user_1", "Recent trip", serde_json::json!({})))
            .await
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(90);
        let purged = db.purge_older_than(cutoff).await.unwrap();
        assert_eq!(purged, 1);

        let remaining = db.memories_for_user("user_1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].summary, "Recent trip");
    }

    #[tokio::test]
    async fn preferences_upsert_replaces() {
        let db = test_store().await;
        assert!(db.preferences_for_user("user_1").await.unwrap().is_none());

        let mut prefs = serde_json::Map::new();
        prefs.insert("cuisine".into(), serde_json::json!({"style": "italian"}));
        db.upsert_preferences("user_1", &prefs, Utc::now())
            .await
            .unwrap();

        prefs.insert("accommodation".into(), serde_json::json!({"type": "hostel"}));
        db.upsert_preferences("user_1", &prefs, Utc::now())
            .await
            .unwrap();

        let stored = db.preferences_for_user("user_1").await.unwrap().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored["cuisine"]["style"], "italian");
        assert_eq!(stored["accommodation"]["type"], "hostel");
    }
}
