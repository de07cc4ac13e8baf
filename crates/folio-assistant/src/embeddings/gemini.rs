//! Gemini `embedContent` client used for live queries and offline chunk indexing.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::EmbeddingModel;
use crate::config::EmbeddingConfig;
use crate::llm::gemini::GEMINI_API_BASE;

#[derive(Clone, Copy, Debug)]
enum TaskType {
    Query,
    Document,
}

impl TaskType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Query => "RETRIEVAL_QUERY",
            Self::Document => "RETRIEVAL_DOCUMENT",
        }
    }
}

pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    dimension: usize,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig, dimension: usize) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("missing Gemini API key for embeddings"))?;
        anyhow::ensure!(!config.model.trim().is_empty(), "missing embedding model name");

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build embedding HTTP client")?;

        let endpoint = format!(
            "{}/{}/models/{}:embedContent",
            GEMINI_API_BASE, config.api_version, config.model
        );

        tracing::info!(model = %config.model, dimension, "Creating GeminiEmbedder");

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint,
            dimension,
        })
    }

    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        anyhow::ensure!(!text.trim().is_empty(), "cannot embed empty text");

        let request = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task.as_str(),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Embedding request to {} timed out", self.endpoint)
                } else {
                    anyhow!("Embedding request to {} failed: {}", self.endpoint, e)
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read embedding response body")?;
        if !status.is_success() {
            let preview: String = body.chars().take(200).collect();
            return Err(anyhow!("Embedding API error ({}): {}", status, preview));
        }

        parse_embedding(&body, self.dimension)
    }
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

fn parse_embedding(body: &str, dimension: usize) -> Result<Vec<f32>> {
    let parsed: EmbedContentResponse =
        serde_json::from_str(body).context("failed to parse embedding response")?;
    let values = parsed
        .embedding
        .map(|e| e.values)
        .ok_or_else(|| anyhow!("embedding response has no values"))?;
    anyhow::ensure!(
        values.len() == dimension,
        "embedding has {} dimensions, expected {}",
        values.len(),
        dimension
    );
    Ok(values)
}

#[async_trait]
impl EmbeddingModel for GeminiEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text, TaskType::Query).await
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text, TaskType::Document).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embedding() {
        let body = r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#;
        assert_eq!(parse_embedding(body, 3).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_parse_embedding_dimension_mismatch() {
        let body = r#"{"embedding":{"values":[0.1,0.2]}}"#;
        assert!(parse_embedding(body, 768).is_err());
    }

    #[test]
    fn test_parse_embedding_missing_values() {
        assert!(parse_embedding("{}", 3).is_err());
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = crate::config::AssistantConfig::default().embedding;
        assert!(GeminiEmbedder::new(&config, 768).is_err());
    }
}
