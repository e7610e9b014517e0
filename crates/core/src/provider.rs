//! Provider traits — the abstraction over the LLM and embedding backends.
//!
//! A `Provider` streams a model response as typed events; the agent loop
//! only depends on this event vocabulary, never on any provider-specific
//! envelope. An `Embedder` turns text into a fixed-dimension vector for
//! the memory subsystem.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbedderError, ProviderError};
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// System instructions (identity, memory context, preference summary)
    pub system: String,

    /// The bounded conversation history plus the working transcript
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// One typed event in a streamed model response.
///
/// This is the whole vocabulary the orchestration core depends on. The
/// `index` on tool events identifies the invocation slot so that argument
/// fragments land on the right in-progress invocation, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderEvent {
    /// A fragment of assistant text.
    TextDelta { text: String },

    /// The model opened a new tool invocation.
    ToolUseStart {
        index: usize,
        id: String,
        name: String,
    },

    /// A fragment of serialized arguments for the invocation at `index`.
    ToolArgumentDelta { index: usize, fragment: String },

    /// The stream ended normally.
    Done,
}

/// The core Provider trait.
///
/// Every LLM backend implements this; the agent loop calls `stream()`
/// without knowing which provider is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a stream of typed response events.
    ///
    /// Transport failures surface either from this call or as an `Err`
    /// item on the channel; both abort the turn.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ProviderEvent, ProviderError>>,
        ProviderError,
    >;
}

/// The embedding provider trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name for this embedder (e.g., "openai").
    fn name(&self) -> &str;

    /// Embed a single text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedderError>;
}
