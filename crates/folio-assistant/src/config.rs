use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::ProviderKind;
use crate::platform::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub data_dir: PathBuf,
    pub knowledge: KnowledgeConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub providers: ProvidersConfig,
    pub retry: RetryConfig,
    pub platform: PlatformConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Precomputed knowledge artifact (chunks + embeddings).
    pub store_path: PathBuf,
    /// Profile dataset. `None` uses the built-in sample profile.
    pub profile_path: Option<PathBuf>,
    pub dimension: usize,
    pub query_cache_size: usize,
    /// Open-ended questions embedded at build time so retrieval still has a
    /// vector for them when live embedding is down.
    #[serde(default = "default_indexed_queries")]
    pub indexed_queries: Vec<String>,
}

fn default_indexed_queries() -> Vec<String> {
    [
        "What motivates you?",
        "What are you working on right now?",
        "How do you approach debugging?",
        "What kind of role are you looking for?",
        "Are you open to remote work?",
        "What are you learning right now?",
        "How do you stay up to date?",
        "What is your design philosophy?",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub default_k: usize,
    /// Chunks scoring below this are dropped from the context.
    pub min_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub api_version: String,
    pub timeout_secs: u64,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Call the serverless proxy resolved by the platform resolver.
    Proxy,
    /// Call the upstream provider API with an API key.
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub primary: ProviderKind,
    pub fallback: Option<ProviderKind>,
    pub transport: TransportMode,
    pub gemini: GeminiConfig,
    pub openrouter: OpenRouterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub model: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Origin the physical endpoint paths are joined onto.
    pub base_url: Option<String>,
    /// Skip detection and use this deployment target.
    pub force: Option<Platform>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub ai_mode: bool,
    /// Prior messages forwarded to chat-completion providers.
    pub history_turns: usize,
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OpenRouterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl AssistantConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.knowledge.dimension == 0 {
            return Err("knowledge.dimension must be > 0".into());
        }
        if self.retrieval.default_k == 0 {
            return Err("retrieval.default_k must be > 0".into());
        }
        if !(-1.0..=1.0).contains(&self.retrieval.min_score) {
            return Err("retrieval.min_score must be in [-1.0, 1.0]".into());
        }
        if self.embedding.timeout_secs == 0 {
            return Err("embedding.timeout_secs must be > 0".into());
        }
        if self.providers.gemini.timeout_secs == 0 || self.providers.openrouter.timeout_secs == 0 {
            return Err("provider timeout_secs must be > 0".into());
        }
        if self.providers.fallback == Some(self.providers.primary) {
            return Err("providers.fallback must differ from providers.primary".into());
        }
        if self.providers.transport == TransportMode::Direct
            && self.api_key_for(self.providers.primary).is_none()
        {
            return Err(format!(
                "direct transport needs an API key for {}",
                self.providers.primary
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".into());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err("retry.base_delay_ms must be <= retry.max_delay_ms".into());
        }
        Ok(())
    }

    /// Load config from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/folio-assistant/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio-assistant")
            .join("config.json")
    }

    /// Pull secrets and deployment knobs from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_env("GEMINI_API_KEY") {
            self.providers.gemini.api_key = Some(key.clone());
            self.embedding.api_key = Some(key);
        }
        if let Some(key) = non_empty_env("OPENROUTER_API_KEY") {
            self.providers.openrouter.api_key = Some(key);
        }
        if let Some(url) = non_empty_env("FOLIO_BASE_URL") {
            self.platform.base_url = Some(url);
        }
        if let Some(flag) = non_empty_env("FOLIO_AI_MODE") {
            self.chat.ai_mode = matches!(flag.to_lowercase().as_str(), "1" | "true" | "on" | "yes");
        }
    }

    pub fn api_key_for(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Gemini => self.providers.gemini.api_key.as_deref(),
            ProviderKind::OpenRouter => self.providers.openrouter.api_key.as_deref(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for AssistantConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio-assistant");

        let store_path = if Path::new("data/knowledge.json").exists() {
            PathBuf::from("data/knowledge.json")
        } else {
            data_dir.join("knowledge.json")
        };

        Self {
            data_dir,
            knowledge: KnowledgeConfig {
                store_path,
                profile_path: None,
                dimension: 768,
                query_cache_size: 256,
                indexed_queries: default_indexed_queries(),
            },
            retrieval: RetrievalConfig {
                default_k: 3,
                min_score: 0.0,
            },
            embedding: EmbeddingConfig {
                model: "text-embedding-004".to_string(),
                api_version: "v1beta".to_string(),
                timeout_secs: 10,
                api_key: None,
            },
            providers: ProvidersConfig {
                primary: ProviderKind::Gemini,
                fallback: Some(ProviderKind::OpenRouter),
                transport: TransportMode::Proxy,
                gemini: GeminiConfig {
                    model: "gemini-1.5-flash".to_string(),
                    api_version: "v1beta".to_string(),
                    temperature: 0.7,
                    max_tokens: 1024,
                    timeout_secs: 30,
                    api_key: None,
                },
                openrouter: OpenRouterConfig {
                    model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
                    temperature: 0.7,
                    max_tokens: 1024,
                    timeout_secs: 60,
                    api_key: None,
                },
            },
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1000,
                max_delay_ms: 8000,
            },
            platform: PlatformConfig {
                base_url: None,
                force: None,
            },
            chat: ChatConfig {
                ai_mode: false,
                history_turns: 6,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AssistantConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.default_k, 3);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_rejects_fallback_equal_to_primary() {
        let mut config = AssistantConfig::default();
        config.providers.fallback = Some(config.providers.primary);
        assert!(config.validate().unwrap_err().contains("fallback"));
    }

    #[test]
    fn test_rejects_direct_transport_without_key() {
        let mut config = AssistantConfig::default();
        config.providers.transport = TransportMode::Direct;
        config.providers.gemini.api_key = None;
        assert!(config.validate().is_err());

        config.providers.gemini.api_key = Some("k".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_retry_delays() {
        let mut config = AssistantConfig::default();
        config.retry.base_delay_ms = 10_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_round_trip() {
        let config = AssistantConfig::default();
        let path = std::env::temp_dir().join(format!("folio-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AssistantConfig::from_file(&path).unwrap();
        assert_eq!(loaded.knowledge.dimension, config.knowledge.dimension);
        assert_eq!(loaded.providers.primary, config.providers.primary);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_api_keys_are_not_serialized() {
        let mut config = AssistantConfig::default();
        config.providers.gemini.api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
