//! The think-act-observe loop.
//!
//! One `handle_turn` call takes a user message to a final answer:
//! resolve the session, gather memories and preferences, then iterate —
//! stream a model response, execute any tool calls, feed results back —
//! until the model answers without tools or the iteration budget runs
//! out. Only the inbound user message and the final assistant message are
//! persisted; intermediate tool turns live in the loop-local transcript
//! and are folded into the final assistant message's records.

use std::sync::Arc;
use tracing::{debug, info, warn};

use waypoint_config::AppConfig;
use waypoint_core::error::OrchestrationError;
use waypoint_core::memory::MemoryRecord;
use waypoint_core::message::{Message, ToolCallRecord};
use waypoint_core::provider::{Provider, ProviderEvent, ProviderRequest};
use waypoint_core::tool::{ToolContext, ToolRegistry, ToolResult};
use waypoint_memory::{extract_preferences, ConversationMemory, PreferenceService, SessionManager};

use crate::coordinator::ToolCoordinator;
use crate::decoder::StreamDecoder;
use crate::stream_event::{AgentStreamEvent, EventSink};

/// Fixed user-facing answer when the iteration budget runs out. Not an
/// error: accumulated tool calls and results still ride along.
pub const BUDGET_EXHAUSTED_MESSAGE: &str =
    "I wasn't able to fully finish working through that request within my planning limit. \
     Could you try narrowing it down, or ask me to continue from here?";

const SYSTEM_IDENTITY: &str = "You are Waypoint, a travel planning assistant. \
    You help users plan trips: destinations, itineraries, weather, and logistics. \
    Use the available tools when they can ground your answer in real data.";

/// Per-loop settings, lifted from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_iterations: u32,
    pub history_limit: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for LoopConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_iterations: config.agent.max_iterations,
            history_limit: config.agent.history_limit,
        }
    }
}

/// What one completed turn settled into.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The resolved session this turn belongs to.
    pub session_id: String,

    /// The final user-facing answer.
    pub message: String,

    /// Every tool call made across all iterations, in dispatch order.
    pub tool_calls: Vec<ToolCallRecord>,

    /// Every tool result, correlated by call id.
    pub tool_results: Vec<ToolResult>,

    /// How many model invocations this turn used.
    pub iterations: u32,

    /// Whether the turn ended on the budget instead of a model answer.
    pub budget_exhausted: bool,
}

/// The orchestrating state machine.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionManager>,
    memory: Arc<ConversationMemory>,
    preferences: Arc<PreferenceService>,
    config: LoopConfig,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionManager>,
        memory: Arc<ConversationMemory>,
        preferences: Arc<PreferenceService>,
        config: LoopConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            sessions,
            memory,
            preferences,
            config,
        }
    }

    /// Run one full turn.
    ///
    /// Hard failures — model transport and session persistence — propagate
    /// as [`OrchestrationError`]. Tool failures, undecodable tool
    /// arguments, and memory unavailability are absorbed into results or
    /// degraded personalization and never abort the turn.
    pub async fn handle_turn(
        &self,
        user_id: Option<&str>,
        session_token: &str,
        trip_id: Option<&str>,
        text: &str,
        sink: &EventSink,
    ) -> Result<TurnOutcome, OrchestrationError> {
        let session = self.sessions.resolve(user_id, session_token, trip_id).await?;
        let history = self
            .sessions
            .recent_history(session_token, self.config.history_limit)
            .await?;

        let context = serde_json::json!({ "trip_id": session.trip_id });
        let user_message = Message::user(text).with_context(context.clone());
        self.sessions.append(&session.id, &user_message).await?;

        let (memories, preferences) = self.personalization(user_id, text).await;
        let system = build_system_prompt(&memories, &preferences);

        let tool_ctx = ToolContext {
            user_id: user_id.map(String::from),
            session_id: session.id.clone(),
            trip_id: session.trip_id.clone(),
        };
        let definitions = self.registry.definitions();
        let coordinator = ToolCoordinator::new(&self.registry);

        let mut transcript = history;
        transcript.push(user_message);

        let mut all_calls: Vec<ToolCallRecord> = Vec::new();
        let mut all_results: Vec<ToolResult> = Vec::new();
        let mut iteration = 0u32;

        let final_text = loop {
            iteration += 1;
            if iteration > self.config.max_iterations {
                info!(session_id = %session.id, "Iteration budget exhausted");
                break None;
            }
            debug!(session_id = %session.id, iteration, "Invoking model");

            let request = ProviderRequest {
                model: self.config.model.clone(),
                system: system.clone(),
                messages: transcript.clone(),
                temperature: self.config.temperature,
                max_tokens: Some(self.config.max_tokens),
                tools: definitions.clone(),
            };

            let mut rx = match self.provider.stream(request).await {
                Ok(rx) => rx,
                Err(e) => {
                    sink.emit(AgentStreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                    return Err(e.into());
                }
            };

            let mut decoder = StreamDecoder::new();
            while let Some(event) = rx.recv().await {
                match event {
                    Ok(ProviderEvent::Done) => break,
                    Ok(event) => {
                        if let ProviderEvent::TextDelta { text } = &event {
                            sink.emit(AgentStreamEvent::Chunk { text: text.clone() }).await;
                        }
                        decoder.apply(&event);
                    }
                    Err(e) => {
                        sink.emit(AgentStreamEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                        return Err(e.into());
                    }
                }
            }
            let decoded = decoder.finish();

            if !decoded.has_tool_calls() {
                break Some(decoded.text);
            }

            let records: Vec<ToolCallRecord> = decoded
                .invocations
                .iter()
                .map(|i| i.record.clone())
                .collect();
            transcript.push(Message::assistant_with_calls(decoded.text, records.clone()));
            all_calls.extend(records);

            let results = coordinator
                .execute_all(decoded.invocations, &tool_ctx, sink)
                .await;
            transcript.push(Message::tool_results(results.clone()));
            all_results.extend(results);
        };

        let budget_exhausted = final_text.is_none();
        let message = final_text.unwrap_or_else(|| BUDGET_EXHAUSTED_MESSAGE.to_string());
        let iterations = if budget_exhausted {
            self.config.max_iterations
        } else {
            iteration
        };

        let mut assistant_message = Message::assistant(&message).with_context(context);
        assistant_message.tool_calls = all_calls.clone();
        assistant_message.tool_results = all_results.clone();
        self.sessions.append(&session.id, &assistant_message).await?;

        // Decoupled memory write: the turn never waits on the embedder.
        if let Some(uid) = user_id {
            let memory = self.memory.clone();
            let uid = uid.to_string();
            let message_id = assistant_message.id.clone();
            let summary = format!("User asked: {text}\nAssistant answered: {message}");
            let metadata = serde_json::json!({
                "session_id": session.id,
                "trip_id": session.trip_id,
            });
            tokio::spawn(async move {
                memory.remember(&uid, Some(message_id), &summary, metadata).await;
            });
        }

        sink.emit(AgentStreamEvent::Done {
            message: message.clone(),
        })
        .await;

        Ok(TurnOutcome {
            session_id: session.id,
            message,
            tool_calls: all_calls,
            tool_results: all_results,
            iterations,
            budget_exhausted,
        })
    }

    /// Memories and preferences for the system prompt. Anonymous users
    /// get none; any failure degrades to "no personalization".
    async fn personalization(
        &self,
        user_id: Option<&str>,
        text: &str,
    ) -> (Vec<MemoryRecord>, serde_json::Map<String, serde_json::Value>) {
        let Some(uid) = user_id else {
            return (Vec::new(), serde_json::Map::new());
        };

        for (category, data) in extract_preferences(text) {
            if let Err(e) = self.preferences.update(uid, category, data).await {
                warn!("Preference update for {category} failed: {e}");
            }
        }

        let memories = self.memory.recall(uid, text).await;
        let preferences = match self.preferences.get(uid).await {
            Ok(map) => map,
            Err(e) => {
                warn!("Preference read failed, continuing without: {e}");
                serde_json::Map::new()
            }
        };
        (memories, preferences)
    }
}

fn build_system_prompt(
    memories: &[MemoryRecord],
    preferences: &serde_json::Map<String, serde_json::Value>,
) -> String {
    let mut prompt = String::from(SYSTEM_IDENTITY);

    if !memories.is_empty() {
        prompt.push_str("\n\nRelevant things you remember about this user:\n");
        for memory in memories {
            prompt.push_str("- ");
            prompt.push_str(&memory.summary);
            prompt.push('\n');
        }
    }

    if !preferences.is_empty() {
        prompt.push_str("\nKnown user preferences:\n");
        prompt.push_str(
            &serde_json::to_string_pretty(preferences).unwrap_or_else(|_| "{}".into()),
        );
    }

    prompt
}
