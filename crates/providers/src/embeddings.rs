//! OpenAI-compatible embedding provider.
//!
//! Any transport or HTTP failure maps to `EmbedderError::Unavailable` so
//! callers can degrade gracefully — the memory subsystem treats an
//! unavailable embedder as "skip personalization", never as a turn failure.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use waypoint_core::error::EmbedderError;
use waypoint_core::provider::Embedder;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible `/embeddings` client.
pub struct OpenAiEmbedder {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    /// Create a new embedder for the given model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            name: "openai".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedderError> {
        if text.trim().is_empty() {
            return Err(EmbedderError::InvalidInput("empty text".into()));
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(model = %self.model, chars = text.len(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbedderError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmbedderError::Unavailable(format!(
                "status {status}: {error_body}"
            )));
        }

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::Unavailable(format!("malformed response: {e}")))?;

        api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedderError::Unavailable("response contained no embedding".into()))
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor() {
        let embedder = OpenAiEmbedder::new("sk-test", "text-embedding-3-small");
        assert_eq!(embedder.name(), "openai");
        assert_eq!(embedder.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let embedder = OpenAiEmbedder::new("sk-test", "text-embedding-3-small")
            .with_base_url("http://localhost:9999/");
        assert_eq!(embedder.base_url, "http://localhost:9999");
    }

    #[tokio::test]
    async fn empty_text_is_invalid_input() {
        let embedder = OpenAiEmbedder::new("sk-test", "text-embedding-3-small");
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbedderError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        let embedder = OpenAiEmbedder::new("sk-test", "text-embedding-3-small")
            .with_base_url("http://127.0.0.1:1");
        let err = embedder.embed("window seats").await.unwrap_err();
        assert!(matches!(err, EmbedderError::Unavailable(_)));
    }

    #[test]
    fn parse_embedding_response() {
        let resp: EmbeddingApiResponse = serde_json::from_str(
            r#"{"data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}], "model": "text-embedding-3-small"}"#,
        )
        .unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].embedding.len(), 3);
    }
}
