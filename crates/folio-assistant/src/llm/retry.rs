//! Bounded exponential-backoff retry around a single provider.
//!
//! Attempts are strictly sequential. Only `RateLimited` and
//! `UpstreamServerError` are retried; the last failure is returned unchanged
//! once attempts run out.

use std::time::Duration;

use super::error::ProviderResult;
use super::{ProviderRequest, TextProvider};
use crate::config::{AssistantConfig, RetryConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&AssistantConfig::default().retry)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

pub async fn generate_with_retry(
    provider: &dyn TextProvider,
    request: &ProviderRequest,
    policy: &RetryPolicy,
) -> ProviderResult {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match provider.generate(request).await {
            Ok(generation) => {
                if attempt > 1 {
                    tracing::info!(provider = %provider.kind(), attempt, "Provider call succeeded after retry");
                }
                return Ok(generation);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            tracing::debug!(provider = %provider.kind(), attempt, kind = ?error.kind, "Terminal provider failure");
            return Err(error);
        }

        if attempt >= max_attempts {
            tracing::warn!(
                provider = %provider.kind(),
                attempts = attempt,
                kind = ?error.kind,
                "Retry attempts exhausted"
            );
            return Err(error);
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            provider = %provider.kind(),
            attempt,
            kind = ?error.kind,
            delay_ms = delay.as_millis() as u64,
            "Retryable provider failure, backing off"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
