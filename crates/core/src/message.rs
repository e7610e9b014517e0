//! Message domain types.
//!
//! A `Message` is the ordered, role-tagged unit of conversation content.
//! The same type serves two purposes: the loop-local working transcript
//! sent to the model, and the durable per-session history. Durable
//! messages are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolResult;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (also carries tool results back to the model)
    User,
    /// The assistant
    Assistant,
}

/// A tool call as recorded on an assistant message.
///
/// Arguments are kept as the raw streamed string — the parsed form lives in
/// [`crate::tool::ToolCall`], which only exists once decoding succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Unique call ID assigned by the provider
    pub id: String,

    /// Name of the tool that was requested
    pub name: String,

    /// Arguments as the raw JSON string, exactly as streamed
    pub arguments: String,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,

    /// Tool results carried back to the model (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,

    /// Point-in-time context snapshot (trip id, active plan, etc.)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,

    /// Timestamp
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            context: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            context: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message carrying tool-call records
    /// (the "act" half of one loop iteration).
    pub fn assistant_with_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRecord>,
    ) -> Self {
        let mut msg = Self::assistant(content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a user message carrying tool results back to the model
    /// (the "observe" half of one loop iteration).
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        let mut msg = Self::user("");
        msg.tool_results = results;
        msg
    }

    /// Attach a context snapshot.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Plan me a weekend in Lyon");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Plan me a weekend in Lyon");
        assert!(msg.tool_calls.is_empty());
        assert!(msg.tool_results.is_empty());
    }

    #[test]
    fn assistant_with_calls_keeps_records() {
        let msg = Message::assistant_with_calls(
            "Checking the weather",
            vec![ToolCallRecord {
                id: "call_1".into(),
                name: "check_weather".into(),
                arguments: r#"{"location":"Lyon, France"}"#.into(),
            }],
        );
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].name, "check_weather");
    }

    #[test]
    fn tool_results_message_is_user_role() {
        let msg = Message::tool_results(vec![ToolResult {
            call_id: "call_1".into(),
            success: true,
            output: "Sunny, 24°C".into(),
            data: None,
        }]);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.tool_results.len(), 1);
        assert_eq!(msg.tool_results[0].call_id, "call_1");
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Test message").with_context(serde_json::json!({"trip": "t1"}));
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test message");
        assert_eq!(deserialized.role, Role::User);
        assert_eq!(deserialized.context["trip"], "t1");
    }
}
