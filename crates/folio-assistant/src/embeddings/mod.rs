pub mod gemini;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiEmbedder;

/// Unified embedding model trait
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a live user query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a knowledge chunk during offline indexing
    async fn embed_document(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch embed documents for indexing
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_document(text).await?);
        }
        Ok(vectors)
    }

    /// Embedding vector dimension
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}
