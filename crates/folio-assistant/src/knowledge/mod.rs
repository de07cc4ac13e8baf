//! Portfolio knowledge store.
//!
//! Chunks are generated offline from the profile dataset, embedded once and saved
//! as a JSON artifact. At runtime the store is an immutable value handed to the
//! retriever; nothing mutates it after construction.

pub mod chunker;
pub mod profile;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::embeddings::EmbeddingModel;
use crate::types::{normalize_query, KnowledgeChunk};

pub use chunker::chunk_profile;
pub use profile::PortfolioProfile;

/// Precomputed embedding for a known query, used when live embedding fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryIndexEntry {
    pub query: String,
    pub embedding: Vec<f32>,
}

/// On-disk form of the knowledge store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeArtifact {
    pub model: String,
    pub dimension: usize,
    pub chunks: Vec<KnowledgeChunk>,
    #[serde(default)]
    pub query_index: Vec<QueryIndexEntry>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    model: String,
    dimension: usize,
    chunks: Vec<KnowledgeChunk>,
    query_index: HashMap<String, Vec<f32>>,
}

impl KnowledgeStore {
    /// Build a store from already-embedded chunks, enforcing the chunk invariants.
    pub fn new(model: impl Into<String>, dimension: usize, chunks: Vec<KnowledgeChunk>) -> Result<Self> {
        anyhow::ensure!(dimension > 0, "embedding dimension must be > 0");

        let mut seen = HashSet::new();
        for chunk in &chunks {
            anyhow::ensure!(!chunk.id.trim().is_empty(), "chunk with empty id");
            anyhow::ensure!(seen.insert(chunk.id.as_str()), "duplicate chunk id '{}'", chunk.id);
            anyhow::ensure!(!chunk.text.trim().is_empty(), "chunk '{}' has empty text", chunk.id);
            anyhow::ensure!(
                chunk.embedding.len() == dimension,
                "chunk '{}' has {} dimensions, expected {}",
                chunk.id,
                chunk.embedding.len(),
                dimension
            );
        }

        Ok(Self {
            model: model.into(),
            dimension,
            chunks,
            query_index: HashMap::new(),
        })
    }

    /// Attach precomputed query embeddings. Entries with the wrong dimension are skipped.
    pub fn with_query_index(mut self, entries: Vec<QueryIndexEntry>) -> Self {
        for entry in entries {
            if entry.embedding.len() != self.dimension {
                tracing::warn!(query = %entry.query, "Skipping query index entry with wrong dimension");
                continue;
            }
            self.query_index.insert(normalize_query(&entry.query), entry.embedding);
        }
        self
    }

    /// Chunk the profile and embed every chunk plus the indexed queries.
    pub async fn build(
        profile: &PortfolioProfile,
        embedder: &dyn EmbeddingModel,
        indexed_queries: &[&str],
    ) -> Result<Self> {
        let drafts = chunk_profile(profile);
        tracing::info!(chunks = drafts.len(), model = embedder.model_name(), "Embedding knowledge chunks");

        let texts: Vec<&str> = drafts.iter().map(|d| d.text.as_str()).collect();
        let vectors = embedder
            .embed_documents(&texts)
            .await
            .context("failed to embed knowledge chunks")?;
        anyhow::ensure!(
            vectors.len() == drafts.len(),
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            drafts.len()
        );

        let chunks = drafts
            .into_iter()
            .zip(vectors)
            .map(|(draft, vector)| draft.with_embedding(vector))
            .collect();

        let mut index = Vec::with_capacity(indexed_queries.len());
        for query in indexed_queries {
            let embedding = embedder
                .embed_query(query)
                .await
                .with_context(|| format!("failed to embed indexed query '{}'", query))?;
            index.push(QueryIndexEntry {
                query: query.to_string(),
                embedding,
            });
        }

        Ok(Self::new(embedder.model_name(), embedder.dimension(), chunks)?.with_query_index(index))
    }

    pub fn from_artifact(artifact: KnowledgeArtifact) -> Result<Self> {
        Ok(Self::new(artifact.model, artifact.dimension, artifact.chunks)?
            .with_query_index(artifact.query_index))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge artifact {}", path.display()))?;
        let artifact: KnowledgeArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse knowledge artifact {}", path.display()))?;
        let store = Self::from_artifact(artifact)?;
        tracing::info!(
            chunks = store.chunks.len(),
            indexed_queries = store.query_index.len(),
            path = %path.display(),
            "Loaded knowledge store"
        );
        Ok(store)
    }

    pub fn to_artifact(&self) -> KnowledgeArtifact {
        let mut query_index: Vec<QueryIndexEntry> = self
            .query_index
            .iter()
            .map(|(query, embedding)| QueryIndexEntry {
                query: query.clone(),
                embedding: embedding.clone(),
            })
            .collect();
        query_index.sort_by(|a, b| a.query.cmp(&b.query));

        KnowledgeArtifact {
            model: self.model.clone(),
            dimension: self.dimension,
            chunks: self.chunks.clone(),
            query_index,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.to_artifact())?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write knowledge artifact {}", path.display()))?;
        Ok(())
    }

    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Precomputed embedding for `query`, matched after normalization.
    pub fn indexed_query_embedding(&self, query: &str) -> Option<&[f32]> {
        self.query_index.get(&normalize_query(query)).map(|v| v.as_slice())
    }
}
