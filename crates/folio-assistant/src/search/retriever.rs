//! Top-K retrieval over the knowledge store.
//!
//! Query embedding order: LRU cache, live embedder, precomputed query index.
//! When none of them yields a vector the retriever returns an empty context and
//! the caller generates without profile context.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::similarity::{cosine_similarity, rank_top_k};
use crate::embeddings::EmbeddingModel;
use crate::knowledge::KnowledgeStore;
use crate::types::{normalize_query, KnowledgeChunk, ScoredChunk};

pub struct Retriever {
    store: Arc<KnowledgeStore>,
    embedder: Option<Arc<dyn EmbeddingModel>>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
    min_score: f32,
}

impl Retriever {
    pub fn new(store: Arc<KnowledgeStore>, embedder: Option<Arc<dyn EmbeddingModel>>) -> Self {
        Self::with_options(store, embedder, 256, f32::MIN)
    }

    pub fn with_options(
        store: Arc<KnowledgeStore>,
        embedder: Option<Arc<dyn EmbeddingModel>>,
        cache_size: usize,
        min_score: f32,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            embedder,
            cache: Mutex::new(LruCache::new(capacity)),
            min_score,
        }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Most similar chunks first. Empty on degraded embedding, never an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<KnowledgeChunk> {
        self.retrieve_scored(query, k)
            .await
            .into_iter()
            .map(|s| s.chunk)
            .collect()
    }

    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        let key = normalize_query(query);
        if key.is_empty() {
            tracing::debug!("Empty query, skipping retrieval");
            return Vec::new();
        }

        let Some(query_vector) = self.query_embedding(query, &key).await else {
            return Vec::new();
        };

        let results = self.rank(&query_vector, k.max(1));
        tracing::debug!(
            hits = results.len(),
            top = ?results.iter().map(|r| r.chunk.id.as_str()).collect::<Vec<_>>(),
            "Retrieved knowledge chunks"
        );
        results
    }

    /// Rank every chunk against a query vector. Pure and deterministic.
    pub fn rank(&self, query_vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        let chunks = self.store.chunks();
        let scored: Vec<(usize, f32)> = chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| cosine_similarity(query_vector, &chunk.embedding).map(|s| (i, s)))
            .filter(|(_, score)| *score >= self.min_score)
            .collect();

        rank_top_k(scored, k)
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: chunks[i].clone(),
                score,
            })
            .collect()
    }

    async fn query_embedding(&self, query: &str, key: &str) -> Option<Vec<f32>> {
        if let Some(hit) = self.cache.lock().get(key) {
            return Some(hit.clone());
        }

        if let Some(embedder) = &self.embedder {
            match embedder.embed_query(query).await {
                Ok(vector) if vector.len() == self.store.dimension() => {
                    self.cache.lock().put(key.to_string(), vector.clone());
                    return Some(vector);
                }
                Ok(vector) => {
                    tracing::warn!(
                        got = vector.len(),
                        expected = self.store.dimension(),
                        "Query embedding has wrong dimension"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Query embedding failed, trying precomputed index");
                }
            }
        }

        match self.store.indexed_query_embedding(query) {
            Some(vector) => Some(vector.to_vec()),
            None => {
                tracing::info!("No query embedding available, continuing without context");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::QueryIndexEntry;
    use crate::types::{ChunkDraft, ChunkType};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixture_store() -> Arc<KnowledgeStore> {
        let chunks = vec![
            ChunkDraft::new("bio", ChunkType::Bio, "Bio", "bio text".into()).with_embedding(vec![1.0, 0.0, 0.0]),
            ChunkDraft::new("skills-1", ChunkType::Skill, "Skills", "skills text".into())
                .with_embedding(vec![0.0, 1.0, 0.0]),
            ChunkDraft::new("project-1", ChunkType::Project, "Droply", "droply text".into())
                .with_embedding(vec![0.0, 1.0, 0.0]),
            ChunkDraft::new("contact", ChunkType::Contact, "Contact", "contact text".into())
                .with_embedding(vec![0.0, 0.0, 1.0]),
        ];
        Arc::new(
            KnowledgeStore::new("fixture", 3, chunks)
                .unwrap()
                .with_query_index(vec![QueryIndexEntry {
                    query: "How can I contact you?".to_string(),
                    embedding: vec![0.0, 0.0, 1.0],
                }]),
        )
    }

    struct MapEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingModel for MapEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| anyhow!("unknown text"))
        }

        async fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_query(text).await
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "map"
        }
    }

    struct OfflineEmbedder;

    #[async_trait]
    impl EmbeddingModel for OfflineEmbedder {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Err(anyhow!("network unreachable"))
        }

        async fn embed_document(&self, _text: &str) -> Result<Vec<f32>> {
            Err(anyhow!("network unreachable"))
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "offline"
        }
    }

    fn map_embedder() -> Arc<MapEmbedder> {
        let mut vectors = HashMap::new();
        vectors.insert("what tools do you use".to_string(), vec![0.1, 0.9, 0.0]);
        vectors.insert("short".to_string(), vec![1.0, 0.0]);
        Arc::new(MapEmbedder {
            vectors,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_retrieve_is_deterministic_with_stable_ties() {
        let retriever = Retriever::new(fixture_store(), Some(map_embedder()));
        let first = retriever.retrieve("what tools do you use", 2).await;
        let ids: Vec<_> = first.iter().map(|c| c.id.as_str()).collect();
        // skills-1 and project-1 tie; original order wins
        assert_eq!(ids, vec!["skills-1", "project-1"]);

        for _ in 0..5 {
            let again = retriever.retrieve("what tools do you use", 2).await;
            assert_eq!(again, first);
        }
    }

    #[tokio::test]
    async fn test_query_embeddings_are_cached() {
        let embedder = map_embedder();
        let retriever = Retriever::new(fixture_store(), Some(embedder.clone()));
        retriever.retrieve("what tools do you use", 3).await;
        retriever.retrieve("What tools do you use?", 3).await;
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_empty_context() {
        let retriever = Retriever::new(fixture_store(), Some(Arc::new(OfflineEmbedder)));
        assert!(retriever.retrieve("explain quantum computing", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_uses_precomputed_index() {
        let retriever = Retriever::new(fixture_store(), Some(Arc::new(OfflineEmbedder)));
        let chunks = retriever.retrieve("how can i contact you", 1).await;
        assert_eq!(chunks[0].id, "contact");
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_treated_as_failure() {
        let retriever = Retriever::new(fixture_store(), Some(map_embedder()));
        assert!(retriever.retrieve("short", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_k_zero_returns_one() {
        let retriever = Retriever::new(fixture_store(), Some(map_embedder()));
        assert_eq!(retriever.retrieve("what tools do you use", 0).await.len(), 1);
    }

    #[test]
    fn test_min_score_filters_chunks() {
        let retriever = Retriever::with_options(fixture_store(), None, 8, 0.5);
        let ranked = retriever.rank(&[1.0, 0.0, 0.0], 4);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].chunk.id, "bio");
    }
}
