//! Session domain type and store trait.
//!
//! A `Session` is the durable identity of one conversation thread.
//! Sessions are created lazily on first message, looked up with null-safe
//! equality on the user id, and never deleted by this subsystem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::message::Message;

/// A logical conversation thread for a (possibly anonymous) user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: String,

    /// The authenticated user, if any
    pub user_id: Option<String>,

    /// The client-supplied session token
    pub session_token: String,

    /// The associated trip/plan, validated or dropped to None
    pub trip_id: Option<String>,

    /// When this session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session. The trip id goes through [`validate_trip_id`]:
    /// a malformed id is dropped to `None` rather than failing the create.
    pub fn new(
        user_id: Option<String>,
        session_token: impl Into<String>,
        trip_id: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            session_token: session_token.into(),
            trip_id: validate_trip_id(trip_id),
            created_at: Utc::now(),
        }
    }
}

/// Validate a trip/plan identifier against the strict UUID format.
/// Returns `None` for absent or malformed values.
pub fn validate_trip_id(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    Uuid::parse_str(raw).ok().map(|u| u.to_string())
}

/// Durable storage for sessions and their messages.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The most recent session matching `(user_id, session_token)`, using
    /// null-safe equality on the user id.
    async fn latest_session(
        &self,
        user_id: Option<&str>,
        session_token: &str,
    ) -> std::result::Result<Option<Session>, StorageError>;

    /// The most recent session matching the token, regardless of user.
    async fn latest_session_by_token(
        &self,
        session_token: &str,
    ) -> std::result::Result<Option<Session>, StorageError>;

    /// Persist a new session.
    async fn create_session(&self, session: &Session)
        -> std::result::Result<(), StorageError>;

    /// The most recent `limit` messages for a session, ordered
    /// oldest-to-newest so they can be appended directly before a new turn.
    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Message>, StorageError>;

    /// Append a message to a session. Pure write: storage errors propagate.
    async fn append_message(
        &self,
        session_id: &str,
        message: &Message,
    ) -> std::result::Result<String, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_trip_id_is_kept() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(validate_trip_id(Some(id)).as_deref(), Some(id));
    }

    #[test]
    fn malformed_trip_id_is_dropped() {
        assert_eq!(validate_trip_id(Some("not-a-uuid")), None);
        assert_eq!(validate_trip_id(Some("")), None);
        assert_eq!(validate_trip_id(None), None);
    }

    #[test]
    fn new_session_drops_bad_trip_id() {
        let s = Session::new(None, "tok_abc", Some("DROP TABLE sessions"));
        assert!(s.trip_id.is_none());
        assert!(!s.id.is_empty());
        assert_eq!(s.session_token, "tok_abc");
    }

    #[test]
    fn new_session_keeps_good_trip_id() {
        let trip = "550e8400-e29b-41d4-a716-446655440000";
        let s = Session::new(Some("user_1".into()), "tok_abc", Some(trip));
        assert_eq!(s.trip_id.as_deref(), Some(trip));
        assert_eq!(s.user_id.as_deref(), Some("user_1"));
    }
}
