//! Gemini-style single-turn generation.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::limits::GEMINI_LIMITS;
use super::transport::{ensure_not_html, normalize_proxy_response, send_with_deadline, Transport};
use super::{is_safety_finish, Generation, GeminiRequest, ProviderKind, ProviderRequest, TextProvider, TokenUsage};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    client: Client,
    transport: Transport,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(transport: Transport, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        tracing::info!(
            endpoint = %transport.describe(),
            timeout_secs = timeout.as_secs(),
            "Creating GeminiProvider"
        );

        Ok(Self {
            client,
            transport,
            timeout,
        })
    }

    /// Validate and clamp a request without touching the network.
    pub fn prepare(request: &ProviderRequest) -> Result<GeminiRequest, ProviderError> {
        let ProviderRequest::Gemini(request) = request else {
            return Err(ProviderError::validation(
                "Gemini provider received an OpenRouter request",
            ));
        };

        if request.prompt.trim().is_empty() {
            return Err(ProviderError::validation("prompt must not be empty"));
        }
        if request.model.trim().is_empty() {
            return Err(ProviderError::validation("model must not be empty"));
        }
        GEMINI_LIMITS.check_input_len(request.prompt_chars())?;

        Ok(GeminiRequest {
            temperature: GEMINI_LIMITS.clamp_temperature(request.temperature),
            max_tokens: GEMINI_LIMITS.clamp_max_tokens(request.max_tokens),
            ..request.clone()
        })
    }

    fn build_http_request(&self, request: &GeminiRequest) -> (reqwest::RequestBuilder, String) {
        match &self.transport {
            Transport::Proxy { url } => {
                let body = json!({
                    "prompt": request.prompt,
                    "model": request.model,
                    "apiVersion": request.api_version,
                    "temperature": request.temperature,
                    "maxTokens": request.max_tokens,
                });
                (self.client.post(url).json(&body), url.clone())
            }
            Transport::Direct { base_url, api_key } => {
                let url = format!(
                    "{}/{}/models/{}:generateContent",
                    base_url.trim_end_matches('/'),
                    request.api_version,
                    request.model
                );
                let body = json!({
                    "contents": [{
                        "role": "user",
                        "parts": [{ "text": request.prompt }]
                    }],
                    "generationConfig": {
                        "temperature": request.temperature,
                        "maxOutputTokens": request.max_tokens,
                    }
                });
                let builder = self
                    .client
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .json(&body);
                (builder, url)
            }
        }
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, request: &ProviderRequest) -> ProviderResult {
        let request = Self::prepare(request)?;
        let (builder, endpoint) = self.build_http_request(&request);

        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt_chars(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "Sending Gemini request"
        );

        let (status, body) = send_with_deadline(builder, self.timeout, &endpoint).await?;
        let result = match self.transport {
            Transport::Proxy { .. } => normalize_proxy_response(status, &body, &request.model),
            Transport::Direct { .. } => normalize_gemini_response(status, &body, &request.model),
        };

        if let Err(e) = &result {
            tracing::warn!(provider = "gemini", status, kind = ?e.kind, "Gemini request failed");
        }
        result
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<TokenUsage>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: Option<String>,
}

/// Normalize a `generateContent` response.
pub fn normalize_gemini_response(status: u16, body: &str, requested_model: &str) -> ProviderResult {
    if !(200..300).contains(&status) {
        let upstream = serde_json::from_str::<GoogleErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error.message);
        return Err(ProviderError::from_status(status, upstream));
    }

    ensure_not_html(body)?;
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("Gemini response is not valid JSON: {}", e)).with_status(status)
    })?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::safety_blocked(&reason).with_status(status));
    }

    let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
        ProviderError::invalid_response("Gemini returned no candidates").with_status(status)
    })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason) if is_safety_finish(reason) => Err(ProviderError::safety_blocked(reason).with_status(status)),
            _ => Err(ProviderError::invalid_response("Gemini candidate has no text").with_status(status)),
        };
    }

    Ok(Generation {
        text,
        model: parsed.model_version.unwrap_or_else(|| requested_model.to_string()),
        finish_reason: candidate.finish_reason,
        usage: parsed.usage_metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{OpenRouterRequest, ProviderErrorKind, ProviderMessage};

    fn request(prompt: &str, temperature: f32, max_tokens: u32) -> ProviderRequest {
        ProviderRequest::Gemini(GeminiRequest {
            prompt: prompt.to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_version: "v1beta".to_string(),
            temperature,
            max_tokens,
        })
    }

    #[test]
    fn test_prompt_limit_counts_chars_not_bytes() {
        let prompt = "é".repeat(50_000);
        let prepared = GeminiProvider::prepare(&request(&prompt, 0.7, 256)).unwrap();
        assert_eq!(prepared.prompt_chars(), 50_000);
        assert!(prepared.prompt.len() > 50_000);

        let err = GeminiProvider::prepare(&request(&format!("{}é", prompt), 0.7, 256)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);
    }

    #[test]
    fn test_prepare_clamps_instead_of_rejecting() {
        let prepared = GeminiProvider::prepare(&request("hello", 5.0, 100_000)).unwrap();
        assert_eq!(prepared.temperature, 2.0);
        assert_eq!(prepared.max_tokens, 8192);
        assert_eq!(prepared.prompt, "hello");
    }

    #[test]
    fn test_prepare_rejects_empty_and_oversized_prompts() {
        let err = GeminiProvider::prepare(&request("   ", 0.7, 100)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);

        let huge = "x".repeat(50_001);
        let err = GeminiProvider::prepare(&request(&huge, 0.7, 100)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);
    }

    #[test]
    fn test_prepare_rejects_wrong_variant() {
        let other = ProviderRequest::OpenRouter(OpenRouterRequest {
            messages: vec![ProviderMessage::user("hi")],
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 10,
        });
        let err = GeminiProvider::prepare(&other).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        // Unroutable proxy URL: a validation failure must come back without a connection attempt.
        let provider = GeminiProvider::new(
            Transport::Proxy { url: "http://127.0.0.1:9/api/gemini".to_string() },
            Duration::from_millis(50),
        )
        .unwrap();
        let err = provider.generate(&request("", 0.7, 10)).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Validation);
    }

    #[test]
    fn test_normalize_success() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "Hi "}, {"text": "there"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6},
            "modelVersion": "gemini-1.5-flash-002"
        }"#;
        let generation = normalize_gemini_response(200, body, "gemini-1.5-flash").unwrap();
        assert_eq!(generation.text, "Hi there");
        assert_eq!(generation.model, "gemini-1.5-flash-002");
        assert_eq!(generation.usage.unwrap().total_tokens, 6);
    }

    #[test]
    fn test_normalize_safety() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = normalize_gemini_response(200, body, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::SafetyBlocked);

        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let err = normalize_gemini_response(200, body, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::SafetyBlocked);
    }

    #[test]
    fn test_normalize_malformed() {
        let err = normalize_gemini_response(200, r#"{"candidates": []}"#, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
        let err = normalize_gemini_response(200, r#"{"candidates": [{"finishReason": "STOP"}]}"#, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }

    #[test]
    fn test_normalize_error_statuses() {
        let body = r#"{"error": {"code": 400, "message": "Invalid JSON payload", "status": "INVALID_ARGUMENT"}}"#;
        let err = normalize_gemini_response(400, body, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::BadRequest);
        assert_eq!(err.message, "Invalid JSON payload");

        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        let err = normalize_gemini_response(403, body, "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Unauthorized);
        assert!(!err.message.contains("API key not valid"));

        let err = normalize_gemini_response(429, "", "m").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    }
}
