//! Configuration loading, validation, and management for Waypoint.
//!
//! Loads configuration from a TOML file with `WAYPOINT_*` environment
//! variable overrides. Every field has a sensible default so an empty or
//! missing file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key (env: `WAYPOINT_API_KEY` / `ANTHROPIC_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible API key for embeddings
    /// (env: `WAYPOINT_EMBEDDING_API_KEY` / `OPENAI_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_api_key: Option<String>,

    /// Default model
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Default max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Memory subsystem settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// SQLite database path (`sqlite::memory:` for ephemeral)
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

/// Agent loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum think-act-observe iterations per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// How many recent messages to feed back as model input
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_limit: default_history_limit(),
        }
    }
}

/// Memory subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum memories recalled per turn
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Minimum cosine similarity for a recalled memory
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Retention window for the purge maintenance operation, in days
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recall_limit: default_recall_limit(),
            min_similarity: default_min_similarity(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_iterations() -> u32 {
    10
}

fn default_history_limit() -> usize {
    10
}

fn default_recall_limit() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.5
}

fn default_retention_days() -> u32 {
    90
}

fn default_database_path() -> String {
    "sqlite://waypoint.db".into()
}

impl AppConfig {
    /// Load configuration from a file path, then apply environment
    /// variable overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("WAYPOINT_API_KEY")
                .ok()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }
        if config.embedding_api_key.is_none() {
            config.embedding_api_key = std::env::var("WAYPOINT_EMBEDDING_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(model) = std::env::var("WAYPOINT_MODEL") {
            config.model = model;
        }
        if let Ok(db) = std::env::var("WAYPOINT_DATABASE") {
            config.database_path = db;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_iterations < 1 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.memory.min_similarity) {
            return Err(ConfigError::ValidationError(
                "memory.min_similarity must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            embedding_api_key: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            database_path: default_database_path(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
