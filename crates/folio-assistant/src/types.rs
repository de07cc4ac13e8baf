use serde::{Deserialize, Serialize};

/// Kind of profile fact a chunk was assembled from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Bio,
    Skill,
    Project,
    Experience,
    Trait,
    Contact,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bio => "bio",
            Self::Skill => "skill",
            Self::Project => "project",
            Self::Experience => "experience",
            Self::Trait => "trait",
            Self::Contact => "contact",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub title: String,
}

/// A retrievable unit of profile knowledge with its precomputed embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Chunk text and metadata before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl ChunkDraft {
    pub fn new(id: impl Into<String>, chunk_type: ChunkType, title: impl Into<String>, text: String) -> Self {
        Self {
            id: id.into(),
            text,
            metadata: ChunkMetadata {
                chunk_type,
                title: title.into(),
            },
        }
    }

    pub fn with_embedding(self, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: self.id,
            text: self.text,
            metadata: self.metadata,
            embedding,
        }
    }
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// Lowercase, strip punctuation and collapse whitespace.
///
/// Shared by the intent router, the query embedding cache and the precomputed
/// query index so the three agree on what "the same query" means.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect::<String>()
        .replace('\'', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  What's   your STACK?! "), "whats your stack");
        assert_eq!(normalize_query("e-mail"), "e mail");
        assert_eq!(normalize_query("???"), "");
    }

    #[test]
    fn test_chunk_metadata_serializes_type_field() {
        let meta = ChunkMetadata {
            chunk_type: ChunkType::Project,
            title: "Droply".to_string(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "project");
        assert_eq!(json["title"], "Droply");
    }
}
