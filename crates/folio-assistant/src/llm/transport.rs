//! HTTP plumbing shared by the providers: deadline handling, body reading and
//! the serverless proxy response contract.

use reqwest::RequestBuilder;
use serde::Deserialize;
use std::time::Duration;

use super::error::{ProviderError, ProviderErrorKind, ProviderResult};
use super::{is_safety_finish, Generation, TokenUsage};

/// Where a provider sends its requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    /// Serverless proxy at a physical URL from the platform resolver.
    Proxy { url: String },
    /// Upstream API, authenticated with the caller's key.
    Direct { base_url: String, api_key: String },
}

impl Transport {
    pub fn describe(&self) -> &str {
        match self {
            Self::Proxy { url } => url,
            Self::Direct { base_url, .. } => base_url,
        }
    }
}

/// Send a request under a hard deadline covering connect, response and body.
pub(crate) async fn send_with_deadline(
    request: RequestBuilder,
    deadline: Duration,
    endpoint: &str,
) -> Result<(u16, String), ProviderError> {
    let exchange = async {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    };

    match tokio::time::timeout(deadline, exchange).await {
        Err(_) => {
            tracing::warn!(endpoint = %endpoint, timeout_ms = deadline.as_millis() as u64, "Provider request timed out");
            Err(ProviderError::new(
                ProviderErrorKind::RequestTimeout,
                format!("No response within {} seconds", deadline.as_secs()),
            ))
        }
        Ok(Err(e)) if e.is_timeout() => Err(ProviderError::new(
            ProviderErrorKind::RequestTimeout,
            "The provider connection timed out",
        )),
        Ok(Err(e)) if e.is_connect() || e.is_request() => {
            tracing::error!(endpoint = %endpoint, error = %e, "Failed to reach provider");
            Err(ProviderError::new(
                ProviderErrorKind::NetworkUnreachable,
                "Could not connect to the provider",
            ))
        }
        Ok(Err(e)) => Err(ProviderError::invalid_response(format!(
            "Failed to read the provider response: {}",
            e
        ))),
        Ok(Ok(exchange)) => Ok(exchange),
    }
}

/// Reject gateway HTML pages before JSON parsing.
pub(crate) fn ensure_not_html(body: &str) -> Result<(), ProviderError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        let preview: String = trimmed.chars().take(120).collect();
        return Err(ProviderError::invalid_response(format!(
            "Endpoint returned HTML instead of JSON: {}",
            preview
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyEnvelope {
    #[serde(default)]
    success: bool,
    response: Option<String>,
    model: Option<String>,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
    error: Option<String>,
}

/// Normalize `{success, response, model, finishReason, usage?}` / `{success:false, error}`.
pub fn normalize_proxy_response(status: u16, body: &str, requested_model: &str) -> ProviderResult {
    let envelope = serde_json::from_str::<ProxyEnvelope>(body).ok();

    if !(200..300).contains(&status) {
        let message = envelope.and_then(|e| e.error);
        // Only a 400 can carry a content rejection; other statuses map by code alone.
        if status == 400 && message.as_deref().is_some_and(mentions_safety) {
            return Err(ProviderError::safety_blocked("proxy").with_status(status));
        }
        return Err(ProviderError::from_status(status, message));
    }

    ensure_not_html(body)?;
    let envelope = envelope.ok_or_else(|| {
        ProviderError::invalid_response("Proxy returned a body that is not the expected JSON").with_status(status)
    })?;

    if !envelope.success {
        let message = envelope
            .error
            .unwrap_or_else(|| "Proxy reported failure without an error message".to_string());
        if mentions_safety(&message) {
            return Err(ProviderError::safety_blocked("proxy").with_status(status));
        }
        return Err(ProviderError::invalid_response(message).with_status(status));
    }

    let text = envelope.response.unwrap_or_default();
    if text.trim().is_empty() {
        return match envelope.finish_reason.as_deref() {
            Some(reason) if is_safety_finish(reason) => Err(ProviderError::safety_blocked(reason).with_status(status)),
            _ => Err(ProviderError::invalid_response("Proxy returned an empty response").with_status(status)),
        };
    }

    Ok(Generation {
        text,
        model: envelope.model.unwrap_or_else(|| requested_model.to_string()),
        finish_reason: envelope.finish_reason,
        usage: envelope.usage,
    })
}

fn mentions_safety(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("safety") || lower.contains("blocked")
}
