//! Itinerary edit tool.
//!
//! Records a change against the trip bound to the current session. The
//! trip id comes from the execution context, never from the model's
//! arguments, so the model cannot edit someone else's plan.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use waypoint_core::error::ToolError;
use waypoint_core::tool::{Tool, ToolContext, ToolResult};

pub struct UpdateItineraryTool;

#[async_trait]
impl Tool for UpdateItineraryTool {
    fn name(&self) -> &str {
        "update_itinerary"
    }

    fn description(&self) -> &str {
        "Add, change, or remove an itinerary entry on the trip being discussed. Requires an active trip."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["add", "update", "remove"],
                    "description": "What to do with the entry"
                },
                "day": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Which day of the trip the entry belongs to"
                },
                "entry": {
                    "type": "string",
                    "description": "The itinerary entry text, e.g. 'Morning: market at Les Halles'"
                }
            },
            "required": ["action", "day", "entry"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let trip_id = ctx.trip_id.as_deref().ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: "update_itinerary".into(),
            reason: "No active trip in this session".into(),
        })?;

        let action = arguments["action"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'action' argument".into()))?;
        if !["add", "update", "remove"].contains(&action) {
            return Err(ToolError::InvalidArguments(format!(
                "Unknown action '{action}'"
            )));
        }
        let day = arguments["day"]
            .as_u64()
            .filter(|d| *d >= 1)
            .ok_or_else(|| ToolError::InvalidArguments("'day' must be a positive integer".into()))?;
        let entry = arguments["entry"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'entry' argument".into()))?;

        debug!(trip_id, action, day, "Itinerary change recorded");

        let change = serde_json::json!({
            "trip_id": trip_id,
            "action": action,
            "day": day,
            "entry": entry,
            "recorded_at": Utc::now().to_rfc3339(),
        });

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!("Recorded '{action}' for day {day} of the trip: {entry}"),
            data: Some(change),
        })
    }
}
