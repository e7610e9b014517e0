//! Streaming response decoder.
//!
//! Demultiplexes the provider's event stream into a growing assistant
//! text buffer and per-slot tool invocations. Argument fragments append
//! strictly in arrival order; nothing is parsed until the stream ends.
//! A payload that fails to parse yields a per-invocation
//! [`ArgumentDecodeError`] — sibling invocations are untouched.

use std::collections::BTreeMap;
use tracing::warn;

use waypoint_core::error::ArgumentDecodeError;
use waypoint_core::message::ToolCallRecord;
use waypoint_core::provider::ProviderEvent;
use waypoint_core::tool::ToolCall;

/// One in-progress tool invocation: identity plus a raw argument buffer.
#[derive(Debug)]
struct ToolArgAccumulator {
    id: String,
    name: String,
    buffer: String,
}

impl ToolArgAccumulator {
    fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            buffer: String::new(),
        }
    }

    fn append(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    /// Parse the accumulated buffer. An empty buffer means a no-argument
    /// call and parses as `{}`.
    fn finalize(self) -> DecodedInvocation {
        let raw = self.buffer;
        let parsed = if raw.trim().is_empty() {
            Ok(serde_json::json!({}))
        } else {
            serde_json::from_str(&raw)
        };

        let record = ToolCallRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: raw.clone(),
        };

        let call = match parsed {
            Ok(arguments) => Ok(ToolCall {
                id: self.id,
                name: self.name,
                arguments,
            }),
            Err(e) => Err(ArgumentDecodeError {
                tool_name: self.name,
                raw,
                reason: e.to_string(),
            }),
        };

        DecodedInvocation { record, call }
    }
}

/// A finalized invocation slot: the raw record for the transcript, and
/// the parse outcome that decides whether it can execute.
#[derive(Debug)]
pub struct DecodedInvocation {
    /// Raw form, as streamed — goes on the assistant message.
    pub record: ToolCallRecord,

    /// Parsed call, or the per-invocation decode failure.
    pub call: Result<ToolCall, ArgumentDecodeError>,
}

/// Everything one model response decoded into.
#[derive(Debug)]
pub struct DecodedResponse {
    /// The full assistant text of this response.
    pub text: String,

    /// Invocation slots in the order the model opened them.
    pub invocations: Vec<DecodedInvocation>,
}

impl DecodedResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.invocations.is_empty()
    }
}

/// Incremental decoder over [`ProviderEvent`]s.
///
/// Knows nothing about tool semantics; it only routes events into slots.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    text: String,
    slots: BTreeMap<usize, ToolArgAccumulator>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. `Done` is a no-op here; the caller stops feeding
    /// events and calls [`finish`](Self::finish).
    pub fn apply(&mut self, event: &ProviderEvent) {
        match event {
            ProviderEvent::TextDelta { text } => self.text.push_str(text),
            ProviderEvent::ToolUseStart { index, id, name } => {
                self.slots
                    .insert(*index, ToolArgAccumulator::new(id.clone(), name.clone()));
            }
            ProviderEvent::ToolArgumentDelta { index, fragment } => {
                match self.slots.get_mut(index) {
                    Some(slot) => slot.append(fragment),
                    // Fragment for a slot that was never opened; drop it
                    // rather than inventing an invocation.
                    None => warn!("Dropping argument fragment for unknown slot {index}"),
                }
            }
            ProviderEvent::Done => {}
        }
    }

    /// Consume the decoder and settle every slot.
    pub fn finish(self) -> DecodedResponse {
        DecodedResponse {
            text: self.text,
            invocations: self
                .slots
                .into_values()
                .map(ToolArgAccumulator::finalize)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(events: Vec<ProviderEvent>) -> DecodedResponse {
        let mut decoder = StreamDecoder::new();
        for event in &events {
            decoder.apply(event);
        }
        decoder.finish()
    }

    #[test]
    fn text_only_response() {
        let response = decode(vec![
            ProviderEvent::TextDelta { text: "Bonjour ".into() },
            ProviderEvent::TextDelta { text: "Lyon!".into() },
            ProviderEvent::Done,
        ]);
        assert_eq!(response.text, "Bonjour Lyon!");
        assert!(!response.has_tool_calls());
    }

    #[test]
    fn arguments_accumulate_across_fragments() {
        let response = decode(vec![
            ProviderEvent::TextDelta { text: "Let me check.".into() },
            ProviderEvent::ToolUseStart {
                index: 0,
                id: "call_1".into(),
                name: "check_weather".into(),
            },
            ProviderEvent::ToolArgumentDelta {
                index: 0,
                fragment: r#"{"location":"#.into(),
            },
            ProviderEvent::ToolArgumentDelta {
                index: 0,
                fragment: r#""Lyon, France"}"#.into(),
            },
            ProviderEvent::Done,
        ]);

        assert_eq!(response.invocations.len(), 1);
        let call = response.invocations[0].call.as_ref().unwrap();
        assert_eq!(call.name, "check_weather");
        assert_eq!(call.arguments["location"], "Lyon, France");
        assert_eq!(
            response.invocations[0].record.arguments,
            r#"{"location":"Lyon, France"}"#
        );
    }

    #[test]
    fn interleaved_slots_demultiplex() {
        let response = decode(vec![
            ProviderEvent::ToolUseStart {
                index: 0,
                id: "call_a".into(),
                name: "check_weather".into(),
            },
            ProviderEvent::ToolUseStart {
                index: 1,
                id: "call_b".into(),
                name: "geocode_location".into(),
            },
            ProviderEvent::ToolArgumentDelta {
                index: 1,
                fragment: r#"{"query":"Lyon"}"#.into(),
            },
            ProviderEvent::ToolArgumentDelta {
                index: 0,
                fragment: r#"{"location":"Lyon, France"}"#.into(),
            },
            ProviderEvent::Done,
        ]);

        assert_eq!(response.invocations.len(), 2);
        assert_eq!(response.invocations[0].record.id, "call_a");
        assert_eq!(response.invocations[1].record.id, "call_b");
        assert!(response.invocations[0].call.is_ok());
        assert!(response.invocations[1].call.is_ok());
    }

    #[test]
    fn malformed_payload_does_not_corrupt_siblings() {
        let response = decode(vec![
            ProviderEvent::ToolUseStart {
                index: 0,
                id: "call_a".into(),
                name: "check_weather".into(),
            },
            ProviderEvent::ToolArgumentDelta {
                index: 0,
                fragment: r#"{"location": "#.into(),
            },
            ProviderEvent::ToolUseStart {
                index: 1,
                id: "call_b".into(),
                name: "geocode_location".into(),
            },
            ProviderEvent::ToolArgumentDelta {
                index: 1,
                fragment: r#"{"query":"Lyon"}"#.into(),
            },
            ProviderEvent::Done,
        ]);

        let err = response.invocations[0].call.as_ref().unwrap_err();
        assert_eq!(err.tool_name, "check_weather");
        assert_eq!(err.raw, r#"{"location": "#);

        let ok = response.invocations[1].call.as_ref().unwrap();
        assert_eq!(ok.arguments["query"], "Lyon");
    }

    #[test]
    fn empty_buffer_parses_as_no_arguments() {
        let response = decode(vec![
            ProviderEvent::ToolUseStart {
                index: 0,
                id: "call_1".into(),
                name: "list_trips".into(),
            },
            ProviderEvent::Done,
        ]);
        let call = response.invocations[0].call.as_ref().unwrap();
        assert_eq!(call.arguments, serde_json::json!({}));
    }

    #[test]
    fn fragment_for_unknown_slot_is_dropped() {
        let response = decode(vec![
            ProviderEvent::ToolArgumentDelta {
                index: 7,
                fragment: "{}".into(),
            },
            ProviderEvent::Done,
        ]);
        assert!(response.invocations.is_empty());
    }
}
