//! Built-in travel tool implementations for Waypoint.
//!
//! Tools give the assistant grounded data to plan with: weather at a
//! destination, geocoding a free-text place name, and itinerary edits.
//! Weather and geocoding are deterministic stubs; in production they
//! would call real APIs behind the same schemas.

pub mod check_weather;
pub mod geocode_location;
pub mod update_itinerary;

use waypoint_core::tool::ToolRegistry;

pub use check_weather::CheckWeatherTool;
pub use geocode_location::GeocodeLocationTool;
pub use update_itinerary::UpdateItineraryTool;

/// Create a tool registry with all built-in travel tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CheckWeatherTool));
    registry.register(Box::new(GeocodeLocationTool));
    registry.register(Box::new(UpdateItineraryTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_tools() {
        let registry = default_registry();
        assert!(registry.get("check_weather").is_some());
        assert!(registry.get("geocode_location").is_some());
        assert!(registry.get("update_itinerary").is_some());
    }
}
