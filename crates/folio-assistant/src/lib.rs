pub mod chat;
pub mod config;
pub mod embeddings;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod platform;
pub mod search;
pub mod types;

// Re-export primary types for convenience
pub use chat::{AssistantReply, ChatEngine, ChatMessage, ChatRole, ChatSession, ReplyRoute};
pub use config::AssistantConfig;
pub use intent::{CannedResponse, IntentCategory, IntentRouter, Route};
pub use knowledge::{KnowledgeStore, PortfolioProfile};
pub use search::Retriever;
pub use types::{ChunkType, KnowledgeChunk};

// Re-export LLM types
pub use llm::{
    build_provider, generate_with_retry, Generation, ProviderError, ProviderErrorKind, ProviderKind,
    ProviderRequest, ProviderResult, RetryPolicy, TextProvider,
};
pub use platform::{EndpointResolver, EnvironmentSnapshot, Platform};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
