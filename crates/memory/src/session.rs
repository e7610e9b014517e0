//! Session resolution and history windows.

use std::sync::Arc;
use tracing::{debug, info};

use waypoint_core::error::StorageError;
use waypoint_core::message::Message;
use waypoint_core::session::{Session, SessionStore};

/// Get-or-create session resolution plus bounded history reads.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Resolve `(user_id, session_token)` to its most recent session,
    /// creating one lazily if none exists. The lookup is null-safe on the
    /// user id, so anonymous sessions resolve consistently. A malformed
    /// `trip_id` on creation is dropped to `None`, never an error.
    pub async fn resolve(
        &self,
        user_id: Option<&str>,
        session_token: &str,
        trip_id: Option<&str>,
    ) -> Result<Session, StorageError> {
        if let Some(existing) = self.store.latest_session(user_id, session_token).await? {
            debug!(session_id = %existing.id, "Resolved existing session");
            return Ok(existing);
        }

        let session = Session::new(user_id.map(String::from), session_token, trip_id);
        self.store.create_session(&session).await?;
        info!(session_id = %session.id, "Created session");
        Ok(session)
    }

    /// The most recent `limit` messages for the latest session matching
    /// the token, oldest-to-newest. An unknown token yields an empty
    /// history, not an error.
    pub async fn recent_history(
        &self,
        session_token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        match self.store.latest_session_by_token(session_token).await? {
            Some(session) => self.store.recent_messages(&session.id, limit).await,
            None => Ok(Vec::new()),
        }
    }

    /// Append a message to a session. Pure write: storage errors propagate
    /// to the caller instead of being swallowed.
    pub async fn append(
        &self,
        session_id: &str,
        message: &Message,
    ) -> Result<String, StorageError> {
        self.store.append_message(session_id, message).await
    }
}
