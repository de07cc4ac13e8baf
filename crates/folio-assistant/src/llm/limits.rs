//! Provider-side limits enforced locally.
//!
//! Oversized payloads are rejected before the network call; temperature and
//! token counts are clamped silently.

use super::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderLimits {
    /// Prompt length (Gemini) or aggregate message content length (OpenRouter), in chars.
    pub max_input_chars: usize,
    pub min_temperature: f32,
    pub max_temperature: f32,
    pub min_tokens: u32,
    pub max_tokens: u32,
}

pub const GEMINI_LIMITS: ProviderLimits = ProviderLimits {
    max_input_chars: 50_000,
    min_temperature: 0.0,
    max_temperature: 2.0,
    min_tokens: 1,
    max_tokens: 8192,
};

pub const OPENROUTER_LIMITS: ProviderLimits = ProviderLimits {
    max_input_chars: 100_000,
    min_temperature: 0.0,
    max_temperature: 2.0,
    min_tokens: 1,
    max_tokens: 4096,
};

impl ProviderLimits {
    pub fn clamp_temperature(&self, temperature: f32) -> f32 {
        if temperature.is_nan() {
            return self.min_temperature;
        }
        temperature.clamp(self.min_temperature, self.max_temperature)
    }

    pub fn clamp_max_tokens(&self, max_tokens: u32) -> u32 {
        max_tokens.clamp(self.min_tokens, self.max_tokens)
    }

    pub fn check_input_len(&self, chars: usize) -> Result<(), ProviderError> {
        if chars > self.max_input_chars {
            return Err(ProviderError::validation(format!(
                "input is {} characters, the limit is {}",
                chars, self.max_input_chars
            )));
        }
        Ok(())
    }
}
