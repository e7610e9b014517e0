//! Geocoding tool — resolves a free-text place name to coordinates.
//!
//! Stub implementation: a small gazetteer of common destinations plus a
//! deterministic fallback, so results are stable across runs.

use async_trait::async_trait;
use waypoint_core::error::ToolError;
use waypoint_core::tool::{Tool, ToolContext, ToolResult};

pub struct GeocodeLocationTool;

#[async_trait]
impl Tool for GeocodeLocationTool {
    fn name(&self) -> &str {
        "geocode_location"
    }

    fn description(&self) -> &str {
        "Resolve a free-text place name to geographic coordinates and a canonical name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A place name to resolve, e.g. 'Lyon' or 'the old town of Prague'"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        if query.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "'query' must not be empty".into(),
            ));
        }

        let place = resolve(query);
        let output = serde_json::to_string_pretty(&place).unwrap_or_default();

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
            data: serde_json::to_value(&place).ok(),
        })
    }
}

#[derive(serde::Serialize)]
struct Place {
    query: String,
    canonical_name: String,
    latitude: f64,
    longitude: f64,
    country: String,
}

const GAZETTEER: &[(&str, &str, f64, f64, &str)] = &[
    ("lyon", "Lyon, France", 45.764, 4.8357, "France"),
    ("paris", "Paris, France", 48.8566, 2.3522, "France"),
    ("tokyo", "Tokyo, Japan", 35.6762, 139.6503, "Japan"),
    ("kyoto", "Kyoto, Japan", 35.0116, 135.7681, "Japan"),
    ("prague", "Prague, Czechia", 50.0755, 14.4378, "Czechia"),
    ("lisbon", "Lisbon, Portugal", 38.7223, -9.1393, "Portugal"),
    ("new york", "New York, USA", 40.7128, -74.006, "USA"),
];

fn resolve(query: &str) -> Place {
    let lowered = query.to_lowercase();

    if let Some((_, name, lat, lon, country)) =
        GAZETTEER.iter().find(|(key, ..)| lowered.contains(key))
    {
        return Place {
            query: query.to_string(),
            canonical_name: name.to_string(),
            latitude: *lat,
            longitude: *lon,
            country: country.to_string(),
        };
    }

    // Unknown place: derive stable pseudo-coordinates from the name.
    let hash: u32 = query
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    Place {
        query: query.to_string(),
        canonical_name: query.to_string(),
        latitude: ((hash % 180) as f64) - 90.0,
        longitude: (((hash / 180) % 360) as f64) - 180.0,
        country: "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_place_resolves_canonically() {
        let tool = GeocodeLocationTool;
        let result = tool
            .execute(
                serde_json::json!({"query": "a weekend in Lyon"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["canonical_name"], "Lyon, France");
        assert_eq!(data["country"], "France");
    }

    #[tokio::test]
    async fn unknown_place_is_deterministic() {
        let tool = GeocodeLocationTool;
        let r1 = tool
            .execute(serde_json::json!({"query": "Middle of Nowhere"}), &ToolContext::default())
            .await
            .unwrap();
        let r2 = tool
            .execute(serde_json::json!({"query": "Middle of Nowhere"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(r1.output, r2.output);
    }

    #[tokio::test]
    async fn empty_query_rejected() {
        let tool = GeocodeLocationTool;
        let result = tool
            .execute(serde_json::json!({"query": "  "}), &ToolContext::default())
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
