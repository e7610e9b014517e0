//! Concurrent tool execution.
//!
//! Every invocation from one model response runs concurrently; each
//! settles into exactly one [`ToolResult`]. A tool failure or an argument
//! decode failure becomes an error-typed result for that invocation alone,
//! so the result list always has one entry per dispatched invocation.

use futures::future::join_all;
use tracing::{debug, warn};

use waypoint_core::tool::{ToolContext, ToolRegistry, ToolResult};

use crate::decoder::DecodedInvocation;
use crate::stream_event::{AgentStreamEvent, EventSink};

/// Fans invocations out against a [`ToolRegistry`].
pub struct ToolCoordinator<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> ToolCoordinator<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute all invocations concurrently and wait for every one to
    /// settle. The returned list has exactly one result per invocation,
    /// each correlated by call id. Futures are joined, not detached:
    /// dropping the caller cancels in-flight executions and no partial
    /// list is ever observable.
    pub async fn execute_all(
        &self,
        invocations: Vec<DecodedInvocation>,
        ctx: &ToolContext,
        sink: &EventSink,
    ) -> Vec<ToolResult> {
        let futures = invocations.into_iter().map(|invocation| async move {
            let name = invocation.record.name.clone();
            let call = match invocation.call {
                Ok(call) => call,
                Err(decode_err) => {
                    // Never reached the registry; settle immediately.
                    warn!("Tool arguments undecodable: {decode_err}");
                    sink.emit(AgentStreamEvent::ToolFailed {
                        call_id: invocation.record.id.clone(),
                        name,
                        error: decode_err.to_string(),
                    })
                    .await;
                    return ToolResult::error(invocation.record.id, decode_err.to_string());
                }
            };

            sink.emit(AgentStreamEvent::ToolStarted {
                call_id: call.id.clone(),
                name: name.clone(),
            })
            .await;

            match self.registry.execute(&call, ctx).await {
                Ok(result) => {
                    debug!("Tool {name} completed for {}", call.id);
                    sink.emit(AgentStreamEvent::ToolCompleted {
                        call_id: call.id.clone(),
                        name,
                        output: result.output.clone(),
                    })
                    .await;
                    result
                }
                Err(e) => {
                    warn!("Tool {name} failed for {}: {e}", call.id);
                    sink.emit(AgentStreamEvent::ToolFailed {
                        call_id: call.id.clone(),
                        name,
                        error: e.to_string(),
                    })
                    .await;
                    ToolResult::error(call.id, e.to_string())
                }
            }
        });

        join_all(futures).await
    }
}
