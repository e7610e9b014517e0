//! Progress events emitted while a turn runs.
//!
//! Callers pass an [`EventSink`] into the loop to get live text chunks
//! and tool progress for streaming display. The sink is best-effort: a
//! dropped receiver never fails a turn.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One observable step of an in-flight turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// A fragment of assistant text, in arrival order.
    Chunk { text: String },

    /// A tool invocation was dispatched.
    ToolStarted { call_id: String, name: String },

    /// A tool invocation settled successfully.
    ToolCompleted {
        call_id: String,
        name: String,
        output: String,
    },

    /// A tool invocation settled with an error.
    ToolFailed {
        call_id: String,
        name: String,
        error: String,
    },

    /// The turn finished with a final answer.
    Done { message: String },

    /// The turn aborted with a hard error.
    Error { message: String },
}

/// Best-effort event channel. `EventSink::disabled()` makes every emit a
/// no-op, so the loop code never branches on "is anyone listening".
#[derive(Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<AgentStreamEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<AgentStreamEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Send an event. A full or closed channel is silently ignored.
    pub async fn emit(&self, event: AgentStreamEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = EventSink::new(tx);
        sink.emit(AgentStreamEvent::Chunk { text: "a".into() }).await;
        sink.emit(AgentStreamEvent::Done {
            message: "done".into(),
        })
        .await;

        assert_eq!(
            rx.recv().await.unwrap(),
            AgentStreamEvent::Chunk { text: "a".into() }
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            AgentStreamEvent::Done { .. }
        ));
    }

    #[tokio::test]
    async fn dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = EventSink::new(tx);
        sink.emit(AgentStreamEvent::Chunk { text: "a".into() }).await;
    }

    #[tokio::test]
    async fn disabled_sink_is_a_noop() {
        let sink = EventSink::disabled();
        sink.emit(AgentStreamEvent::Chunk { text: "a".into() }).await;
    }

    #[test]
    fn event_serialization() {
        let event = AgentStreamEvent::ToolStarted {
            call_id: "call_1".into(),
            name: "check_weather".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_started""#));
    }
}
