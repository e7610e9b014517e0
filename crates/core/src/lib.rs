//! # Waypoint Core
//!
//! Domain types, traits, and error definitions for the Waypoint agent
//! orchestration runtime. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{
    ArgumentDecodeError, EmbedderError, Error, OrchestrationError, ProviderError, Result,
    StorageError, ToolError,
};
pub use memory::{MemoryRecord, MemoryStore, PreferenceStore};
pub use message::{Message, Role, ToolCallRecord};
pub use provider::{Embedder, Provider, ProviderEvent, ProviderRequest, ToolDefinition};
pub use session::{Session, SessionStore};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult};
