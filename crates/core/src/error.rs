//! Error types for the Waypoint domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type.

use thiserror::Error;

/// The top-level error type for all Waypoint operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// A tool-argument payload that could not be parsed once the stream ended.
///
/// Carries the tool name and the raw accumulated buffer so the failure can
/// be reported back to the model as an error-typed tool result for that
/// invocation alone. Sibling invocations are unaffected.
#[derive(Debug, Clone, Error)]
#[error("Failed to decode arguments for tool '{tool_name}': {reason} (raw: {raw})")]
pub struct ArgumentDecodeError {
    pub tool_name: String,
    pub raw: String,
    pub reason: String,
}

/// Embedding provider failures.
///
/// `Unavailable` is deliberately distinct from an empty embedding: callers
/// treat it as "degrade gracefully", never as data.
#[derive(Debug, Clone, Error)]
pub enum EmbedderError {
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding request invalid: {0}")]
    InvalidInput(String),
}

/// The only failures that escape the agent loop as hard errors.
///
/// Everything else (tool failures, argument decode failures, memory
/// unavailability) is absorbed into tool results or terminal-state answers.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Model transport failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store transport failed: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn argument_decode_error_carries_name_and_buffer() {
        let err = ArgumentDecodeError {
            tool_name: "check_weather".into(),
            raw: "{\"location\": ".into(),
            reason: "unexpected end of input".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("check_weather"));
        assert!(msg.contains("{\"location\": "));
    }

    #[test]
    fn orchestration_error_from_provider() {
        let err: OrchestrationError = ProviderError::Network("connection refused".into()).into();
        assert!(matches!(err, OrchestrationError::Provider(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
