//! The Waypoint agent loop.
//!
//! Orchestrates one conversation turn: compose model input from session
//! history, memories, and preferences; stream the model response through
//! the [`decoder`]; fan tool invocations out via the [`coordinator`]; and
//! repeat under an iteration budget.

pub mod coordinator;
pub mod decoder;
pub mod loop_runner;
pub mod stream_event;

pub use coordinator::ToolCoordinator;
pub use decoder::{DecodedInvocation, DecodedResponse, StreamDecoder};
pub use loop_runner::{AgentLoop, LoopConfig, TurnOutcome, BUDGET_EXHAUSTED_MESSAGE};
pub use stream_event::{AgentStreamEvent, EventSink};
