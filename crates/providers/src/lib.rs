//! Provider implementations for Waypoint.
//!
//! - [`AnthropicProvider`] — the Messages API over SSE, translated into the
//!   core [`waypoint_core::ProviderEvent`] vocabulary.
//! - [`OpenAiEmbedder`] — an OpenAI-compatible `/embeddings` client.

pub mod anthropic;
pub mod embeddings;

pub use anthropic::AnthropicProvider;
pub use embeddings::OpenAiEmbedder;
