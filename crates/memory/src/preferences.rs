//! Per-user preference map and keyword-based extraction.
//!
//! Preferences live as one JSON object per user, keyed by category
//! ("accommodation", "cuisine", ...). Updates shallow-merge into the
//! existing category object so independent fields survive each other.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use waypoint_core::error::StorageError;
use waypoint_core::memory::PreferenceStore;

/// Read-merge-upsert service over a [`PreferenceStore`].
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Shallow-merge `data` into the user's preferences at `category` and
    /// persist the whole object. Fields not mentioned in `data` are kept;
    /// fields present in both take the new value.
    pub async fn update(
        &self,
        user_id: &str,
        category: &str,
        data: serde_json::Value,
    ) -> Result<(), StorageError> {
        let mut preferences = self
            .store
            .preferences_for_user(user_id)
            .await?
            .unwrap_or_default();

        let merged = match (preferences.get(category), &data) {
            (Some(serde_json::Value::Object(existing)), serde_json::Value::Object(incoming)) => {
                let mut out = existing.clone();
                for (k, v) in incoming {
                    out.insert(k.clone(), v.clone());
                }
                serde_json::Value::Object(out)
            }
            // Non-object on either side: the new value replaces wholesale.
            _ => data,
        };

        preferences.insert(category.to_string(), merged);
        self.store
            .upsert_preferences(user_id, &preferences, Utc::now())
            .await?;

        debug!("Updated {category} preferences for {user_id}");
        Ok(())
    }

    /// The full category map for a user; empty map when none exist.
    pub async fn get(
        &self,
        user_id: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, StorageError> {
        Ok(self
            .store
            .preferences_for_user(user_id)
            .await?
            .unwrap_or_default())
    }
}

/// Detect preference mentions in free text with keyword matching.
/// First matching keyword wins within a category; categories are
/// independent, so one message can yield several updates.
pub fn extract_preferences(text: &str) -> Vec<(&'static str, serde_json::Value)> {
    let lowered = text.to_lowercase();
    let mut detected = Vec::new();

    const ACCOMMODATION: &[&str] = &["hostel", "boutique hotel", "hotel", "airbnb", "resort", "camping"];
    const CUISINE: &[&str] = &["vegetarian", "vegan", "street food", "fine dining", "seafood", "local cuisine"];
    const ACTIVITIES: &[&str] = &["hiking", "museums", "beaches", "nightlife", "shopping", "skiing"];
    const BUDGET: &[&str] = &["budget", "luxury", "mid-range", "cheap", "splurge"];
    const CLIMATE: &[&str] = &["warm", "tropical", "cold", "mild", "sunny"];

    let groups: [(&str, &str, &[&str]); 5] = [
        ("accommodation", "style", ACCOMMODATION),
        ("cuisine", "style", CUISINE),
        ("activities", "interest", ACTIVITIES),
        ("budget", "level", BUDGET),
        ("climate", "preference", CLIMATE),
    ];

    for (category, field, keywords) in groups {
        if let Some(hit) = keywords.iter().find(|k| lowered.contains(*k)) {
            detected.push((category, serde_json::json!({ field: hit })));
        }
    }

    detected
}
