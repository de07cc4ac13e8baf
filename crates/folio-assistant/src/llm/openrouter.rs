//! OpenRouter-style chat completion.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::limits::OPENROUTER_LIMITS;
use super::transport::{ensure_not_html, normalize_proxy_response, send_with_deadline, Transport};
use super::{is_safety_finish, Generation, OpenRouterRequest, ProviderKind, ProviderRequest, TextProvider, TokenUsage};

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

pub struct OpenRouterProvider {
    client: Client,
    transport: Transport,
    timeout: Duration,
}

impl OpenRouterProvider {
    pub fn new(transport: Transport, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        tracing::info!(
            endpoint = %transport.describe(),
            timeout_secs = timeout.as_secs(),
            "Creating OpenRouterProvider"
        );

        Ok(Self {
            client,
            transport,
            timeout,
        })
    }

    /// Validate and clamp a request without touching the network.
    pub fn prepare(request: &ProviderRequest) -> Result<OpenRouterRequest, ProviderError> {
        let ProviderRequest::OpenRouter(request) = request else {
            return Err(ProviderError::validation(
                "OpenRouter provider received a Gemini request",
            ));
        };

        if request.messages.is_empty() {
            return Err(ProviderError::validation("messages must not be empty"));
        }
        if request.model.trim().is_empty() {
            return Err(ProviderError::validation("model must not be empty"));
        }
        if let Some(index) = request.messages.iter().position(|m| m.content.trim().is_empty()) {
            return Err(ProviderError::validation(format!(
                "message {} has empty content",
                index
            )));
        }

        let total: usize = request.messages.iter().map(|m| m.content.chars().count()).sum();
        OPENROUTER_LIMITS.check_input_len(total)?;

        Ok(OpenRouterRequest {
            temperature: OPENROUTER_LIMITS.clamp_temperature(request.temperature),
            max_tokens: OPENROUTER_LIMITS.clamp_max_tokens(request.max_tokens),
            ..request.clone()
        })
    }

    fn build_http_request(&self, request: &OpenRouterRequest) -> (reqwest::RequestBuilder, String) {
        match &self.transport {
            Transport::Proxy { url } => {
                let body = json!({
                    "messages": request.messages,
                    "model": request.model,
                    "temperature": request.temperature,
                    "maxTokens": request.max_tokens,
                    "stream": false,
                });
                (self.client.post(url).json(&body), url.clone())
            }
            Transport::Direct { base_url, api_key } => {
                let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
                let body = json!({
                    "model": request.model,
                    "messages": request.messages,
                    "temperature": request.temperature,
                    "max_tokens": request.max_tokens,
                    "stream": false,
                });
                let builder = self.client.post(&url).bearer_auth(api_key).json(&body);
                (builder, url)
            }
        }
    }
}

#[async_trait]
impl TextProvider for OpenRouterProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    async fn generate(&self, request: &ProviderRequest) -> ProviderResult {
        let request = Self::prepare(request)?;
        let (builder, endpoint) = self.build_http_request(&request);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "Sending OpenRouter request"
        );

        let (status, body) = send_with_deadline(builder, self.timeout, &endpoint).await?;
        let result = match self.transport {
            Transport::Proxy { .. } => normalize_proxy_response(status, &body, &request.model),
            Transport::Direct { .. } => normalize_openrouter_response(status, &body, &request.model),
        };

        if let Err(e) = &result {
            tracing::warn!(provider = "openrouter", status, kind = ?e.kind, "OpenRouter request failed");
        }
        result
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<TokenUsage>,
    error: Option<CompletionError>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionError {
    code: Option<serde_json::Value>,
    message: Option<String>,
}

impl CompletionError {
    fn status(&self) -> Option<u16> {
        match &self.code {
            Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Normalize a `chat/completions` response. OpenRouter can report upstream
/// failures inside a 200 body, so the embedded error code wins over the status.
pub fn normalize_openrouter_response(status: u16, body: &str, requested_model: &str) -> ProviderResult {
    let parsed = serde_json::from_str::<CompletionResponse>(body).ok();

    if !(200..300).contains(&status) {
        let upstream = parsed.and_then(|p| p.error).and_then(|e| e.message);
        return Err(ProviderError::from_status(status, upstream));
    }

    ensure_not_html(body)?;

    let parsed = parsed.ok_or_else(|| {
        ProviderError::invalid_response("OpenRouter response is not valid JSON").with_status(status)
    })?;

    if let Some(error) = parsed.error {
        let embedded = error.status().unwrap_or(502);
        return Err(ProviderError::from_status(embedded, error.message));
    }

    let choice = parsed.choices.into_iter().next().ok_or_else(|| {
        ProviderError::invalid_response("OpenRouter returned no choices").with_status(status)
    })?;

    let text = choice.message.and_then(|m| m.content).unwrap_or_default();
    if text.trim().is_empty() {
        return match choice.finish_reason.as_deref() {
            Some(reason) if is_safety_finish(reason) => Err(ProviderError::safety_blocked(reason).with_status(status)),
            _ => Err(ProviderError::invalid_response("OpenRouter choice has no content").with_status(status)),
        };
    }

    Ok(Generation {
        text,
        model: parsed.model.unwrap_or_else(|| requested_model.to_string()),
        finish_reason: choice.finish_reason,
        usage: parsed.usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GeminiRequest, ProviderErrorKind, ProviderMessage};

    fn request(messages: Vec<ProviderMessage>, temperature: f32, max_tokens: u32) -> ProviderRequest {
        ProviderRequest::OpenRouter(OpenRouterRequest {
            messages,
            model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
            temperature,
            max_tokens,
        })
    }

    #[test]
    fn test_prepare_clamps() {
        let prepared = OpenRouterProvider::prepare(&request(vec![ProviderMessage::user("hi")], 5.0, 8192)).unwrap();
        assert_eq!(prepared.temperature, 2.0);
        assert_eq!(prepared.max_tokens, 4096);
    }

    #[test]
    fn test_prepare_validates_messages() {
        let err = OpenRouterProvider::prepare(&request(vec![], 0.7, 100)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);

        let messages = vec![ProviderMessage::system("persona"), ProviderMessage::user("  ")];
        let err = OpenRouterProvider::prepare(&request(messages, 0.7, 100)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);
        assert!(err.message.contains("message 1"));
    }

    #[test]
    fn test_prepare_checks_aggregate_length() {
        let messages = vec![
            ProviderMessage::system("a".repeat(60_000)),
            ProviderMessage::user("b".repeat(40_001)),
        ];
        let err = OpenRouterProvider::prepare(&request(messages, 0.7, 100)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);

        let messages = vec![
            ProviderMessage::system("a".repeat(60_000)),
            ProviderMessage::user("b".repeat(40_000)),
        ];
        assert!(OpenRouterProvider::prepare(&request(messages, 0.7, 100)).is_ok());
    }

    #[test]
    fn test_prepare_rejects_wrong_variant() {
        let other = ProviderRequest::Gemini(GeminiRequest {
            prompt: "hi".to_string(),
            model: "m".to_string(),
            api_version: "v1beta".to_string(),
            temperature: 0.7,
            max_tokens: 10,
        });
        assert_eq!(
            OpenRouterProvider::prepare(&other).unwrap_err().kind,
            ProviderErrorKind::Validation
        );
    }

    #[test]
    fn test_normalize_success() {
        let body = r#"{
            "model": "meta-llama/llama-3.1-8b-instruct",
            "choices": [{"message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        }"#;
        let generation = normalize_openrouter_response(200, body, "requested").unwrap();
        assert_eq!(generation.text, "Hello");
        assert_eq!(generation.model, "meta-llama/llama-3.1-8b-instruct");
        assert_eq!(generation.finish_reason.as_deref(), Some("stop"));
        assert_eq!(generation.usage.unwrap().prompt_tokens, 10);
    }

    #[test]
    fn test_normalize_content_filter() {
        let body = r#"{"choices": [{"message": {"content": ""}, "finish_reason": "content_filter"}]}"#;
        let err = normalize_openrouter_response(200, body, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::SafetyBlocked);
        assert!(err.user_message().contains("rephras"));
    }

    #[test]
    fn test_normalize_embedded_error() {
        let body = r#"{"error": {"code": 429, "message": "Rate limit exceeded: free-models-per-min"}}"#;
        let err = normalize_openrouter_response(200, body, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        assert_eq!(err.http_status, Some(429));
    }

    #[test]
    fn test_normalize_statuses() {
        let body = r#"{"error": {"code": 402, "message": "Insufficient credits on account 9"}}"#;
        let err = normalize_openrouter_response(402, body, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::QuotaExceeded);
        assert!(!err.message.contains("account 9"));

        let err = normalize_openrouter_response(503, "<html>bad gateway</html>", "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::UpstreamServerError);

        let err = normalize_openrouter_response(200, "<html>cached page</html>", "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);

        let err = normalize_openrouter_response(500, "", "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::UpstreamServerError);
    }
}
