use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy shared by every provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Rejected locally before any network call.
    Validation,
    RateLimited,
    UpstreamServerError,
    RequestTimeout,
    BadRequest,
    Unauthorized,
    QuotaExceeded,
    SafetyBlocked,
    InvalidResponse,
    NetworkUnreachable,
}

impl ProviderErrorKind {
    /// Only rate limits and upstream 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::UpstreamServerError)
    }

    /// Failures that say the provider is unavailable rather than the request being bad.
    pub fn is_availability_failure(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::UpstreamServerError
                | Self::RequestTimeout
                | Self::NetworkUnreachable
                | Self::QuotaExceeded
        )
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Validation, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }

    pub fn safety_blocked(reason: &str) -> Self {
        Self::new(
            ProviderErrorKind::SafetyBlocked,
            format!(
                "The response was withheld by the provider's safety filter ({}). Try rephrasing the question.",
                reason
            ),
        )
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Map a non-success HTTP status to the taxonomy.
    ///
    /// Upstream detail is kept only for 400 and 429; auth and quota failures get a
    /// fixed message.
    pub fn from_status(status: u16, upstream_message: Option<String>) -> Self {
        let upstream = upstream_message.filter(|m| !m.trim().is_empty());
        let (kind, message) = match status {
            429 => (
                ProviderErrorKind::RateLimited,
                upstream.unwrap_or_else(|| "Rate limit exceeded".to_string()),
            ),
            400 => (
                ProviderErrorKind::BadRequest,
                upstream.unwrap_or_else(|| "The provider rejected the request".to_string()),
            ),
            401 | 403 => (
                ProviderErrorKind::Unauthorized,
                "The provider rejected the request credentials".to_string(),
            ),
            402 => (
                ProviderErrorKind::QuotaExceeded,
                "The provider quota has been exhausted".to_string(),
            ),
            408 => (
                ProviderErrorKind::RequestTimeout,
                "The provider timed out handling the request".to_string(),
            ),
            s if s >= 500 => (
                ProviderErrorKind::UpstreamServerError,
                format!("The provider returned a server error (HTTP {})", s),
            ),
            s if s >= 400 => (
                ProviderErrorKind::BadRequest,
                upstream.unwrap_or_else(|| format!("The provider rejected the request (HTTP {})", s)),
            ),
            s => (
                ProviderErrorKind::InvalidResponse,
                format!("Unexpected HTTP status {}", s),
            ),
        };
        Self::new(kind, message).with_status(status)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Text safe to show in the chat window.
    pub fn user_message(&self) -> String {
        match self.kind {
            ProviderErrorKind::SafetyBlocked => {
                "I can't answer that one as phrased. Could you try rephrasing your question?".to_string()
            }
            ProviderErrorKind::RateLimited | ProviderErrorKind::UpstreamServerError => {
                "I'm getting a lot of questions right now. Please try again in a moment.".to_string()
            }
            _ => "Sorry, something went wrong on my end. Please try again.".to_string(),
        }
    }
}

pub type ProviderResult = Result<super::Generation, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProviderError::from_status(429, None).kind, ProviderErrorKind::RateLimited);
        assert_eq!(ProviderError::from_status(400, None).kind, ProviderErrorKind::BadRequest);
        assert_eq!(ProviderError::from_status(401, None).kind, ProviderErrorKind::Unauthorized);
        assert_eq!(ProviderError::from_status(403, None).kind, ProviderErrorKind::Unauthorized);
        assert_eq!(ProviderError::from_status(402, None).kind, ProviderErrorKind::QuotaExceeded);
        assert_eq!(ProviderError::from_status(500, None).kind, ProviderErrorKind::UpstreamServerError);
        assert_eq!(ProviderError::from_status(503, None).kind, ProviderErrorKind::UpstreamServerError);
        assert_eq!(ProviderError::from_status(404, None).kind, ProviderErrorKind::BadRequest);
    }

    #[test]
    fn test_bad_request_surfaces_upstream_message() {
        let err = ProviderError::from_status(400, Some("prompt is too long".to_string()));
        assert_eq!(err.message, "prompt is too long");
        assert_eq!(err.http_status, Some(400));
    }

    #[test]
    fn test_auth_and_quota_hide_upstream_detail() {
        let err = ProviderError::from_status(401, Some("key sk-123 revoked for abuse".to_string()));
        assert!(!err.message.contains("sk-123"));
        let err = ProviderError::from_status(402, Some("account 42 owes $10".to_string()));
        assert!(!err.message.contains("42"));
        assert!(!err.user_message().contains("42"));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ProviderErrorKind::RateLimited.is_retryable());
        assert!(ProviderErrorKind::UpstreamServerError.is_retryable());
        assert!(!ProviderErrorKind::RequestTimeout.is_retryable());
        assert!(!ProviderErrorKind::Unauthorized.is_retryable());
        assert!(!ProviderErrorKind::Validation.is_retryable());
    }

    #[test]
    fn test_safety_user_message_suggests_rephrasing() {
        let err = ProviderError::safety_blocked("SAFETY");
        assert!(err.user_message().contains("rephras"));
    }
}
