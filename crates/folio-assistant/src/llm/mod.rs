//! LLM Module - provider abstraction over the Gemini and OpenRouter backends
//!
//! Every provider takes a [`ProviderRequest`] and returns a [`ProviderResult`]:
//! validation, clamping, timeout and upstream error normalization happen inside
//! `generate`, so callers only ever see the shared error taxonomy.

pub mod error;
pub mod gemini;
pub mod limits;
pub mod openrouter;
pub mod prompt;
pub mod retry;
pub mod transport;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{AssistantConfig, TransportMode};
use crate::platform::EndpointResolver;

pub use error::{ProviderError, ProviderErrorKind, ProviderResult};
pub use gemini::GeminiProvider;
pub use limits::{ProviderLimits, GEMINI_LIMITS, OPENROUTER_LIMITS};
pub use openrouter::OpenRouterProvider;
pub use prompt::{PromptComposer, RequestDefaults};
pub use retry::{generate_with_retry, RetryPolicy};
pub use transport::Transport;

/// Supported upstream providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenRouter,
}

impl ProviderKind {
    /// Logical serverless function name the platform resolver maps to a path.
    pub fn logical_endpoint(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.logical_endpoint())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl FromStr for MessageRole {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(ProviderError::validation(format!(
                "invalid message role '{}': expected system, user or assistant",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ProviderMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }

    /// Build from untyped input such as a UI payload; the role must be known.
    pub fn parse(role: &str, content: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self { role: role.parse()?, content: content.into() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub prompt: String,
    pub model: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GeminiRequest {
    /// Prompt length in chars, the unit the input limit is expressed in.
    pub fn prompt_chars(&self) -> usize {
        self.prompt.chars().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenRouterRequest {
    pub messages: Vec<ProviderMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One generation call, built fresh per turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderRequest {
    Gemini(GeminiRequest),
    OpenRouter(OpenRouterRequest),
}

impl ProviderRequest {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Gemini(_) => ProviderKind::Gemini,
            Self::OpenRouter(_) => ProviderKind::OpenRouter,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Gemini(r) => &r.model,
            Self::OpenRouter(r) => &r.model,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    #[serde(default, alias = "promptTokenCount")]
    pub prompt_tokens: u32,
    #[serde(default, alias = "candidatesTokenCount")]
    pub completion_tokens: u32,
    #[serde(default, alias = "totalTokenCount")]
    pub total_tokens: u32,
}

/// Successful generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Generation {
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Core trait for text generation providers
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Validate, clamp, send and normalize one request. Never retries.
    async fn generate(&self, request: &ProviderRequest) -> ProviderResult;
}

/// Build the provider for `kind` on the configured transport. Proxy mode
/// targets the resolver's path for the provider's logical endpoint.
pub fn build_provider(
    kind: ProviderKind,
    config: &AssistantConfig,
    resolver: &EndpointResolver,
) -> anyhow::Result<Arc<dyn TextProvider>> {
    let transport = match config.providers.transport {
        TransportMode::Proxy => Transport::Proxy {
            url: resolver.resolve_url(kind.logical_endpoint()),
        },
        TransportMode::Direct => {
            let api_key = config
                .api_key_for(kind)
                .with_context(|| format!("direct transport needs an API key for {}", kind))?
                .to_string();
            let base_url = match kind {
                ProviderKind::Gemini => gemini::GEMINI_API_BASE,
                ProviderKind::OpenRouter => openrouter::OPENROUTER_API_BASE,
            };
            Transport::Direct {
                base_url: base_url.to_string(),
                api_key,
            }
        }
    };

    let provider: Arc<dyn TextProvider> = match kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(transport, config.providers.gemini.timeout())?),
        ProviderKind::OpenRouter => {
            Arc::new(OpenRouterProvider::new(transport, config.providers.openrouter.timeout())?)
        }
    };
    Ok(provider)
}

/// Finish reasons that mean the candidate was withheld for content reasons.
pub(crate) fn is_safety_finish(reason: &str) -> bool {
    matches!(
        reason.to_ascii_uppercase().as_str(),
        "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" | "RECITATION" | "CONTENT_FILTER"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_parse() {
        assert_eq!(ProviderMessage::parse("user", "hi").unwrap().role, MessageRole::User);
        let err = ProviderMessage::parse("tool", "hi").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);
    }

    #[test]
    fn test_request_serializes_with_provider_tag() {
        let request = ProviderRequest::Gemini(GeminiRequest {
            prompt: "hi".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_version: "v1beta".to_string(),
            temperature: 0.7,
            max_tokens: 256,
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["provider"], "gemini");
        assert_eq!(json["apiVersion"], "v1beta");
        assert_eq!(json["maxTokens"], 256);
    }

    #[test]
    fn test_usage_accepts_gemini_field_names() {
        let usage: TokenUsage =
            serde_json::from_str(r#"{"promptTokenCount":3,"candidatesTokenCount":4,"totalTokenCount":7}"#).unwrap();
        assert_eq!(usage.total_tokens, 7);
    }

    #[test]
    fn test_build_provider_per_transport() {
        use crate::platform::Platform;

        let resolver = EndpointResolver::new(Platform::Netlify, None);
        let mut config = AssistantConfig::default();
        let provider = build_provider(ProviderKind::OpenRouter, &config, &resolver).unwrap();
        assert_eq!(provider.kind(), ProviderKind::OpenRouter);

        config.providers.transport = TransportMode::Direct;
        config.providers.gemini.api_key = None;
        assert!(build_provider(ProviderKind::Gemini, &config, &resolver).is_err());

        config.providers.gemini.api_key = Some("key".to_string());
        assert!(build_provider(ProviderKind::Gemini, &config, &resolver).is_ok());
    }

    #[test]
    fn test_safety_finish_reasons() {
        assert!(is_safety_finish("SAFETY"));
        assert!(is_safety_finish("content_filter"));
        assert!(!is_safety_finish("STOP"));
    }
}
