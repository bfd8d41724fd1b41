//! Configuration for the generation engine

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Configuration for the chat-completions generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as a bearer token
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per reply; replies are spoken, so keep them short
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// System prompt prepended to every request
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    300
}

const fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
            system_prompt: None,
        }
    }
}

impl GenerationConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`GenerationError::InvalidConfig`] when a field is out of range
    /// or required and missing.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.base_url.trim().is_empty() {
            return Err(GenerationError::InvalidConfig("base_url is empty".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::InvalidConfig("api_key is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(GenerationError::InvalidConfig("model is empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GenerationError::InvalidConfig(format!(
                "temperature {} out of range 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(GenerationError::InvalidConfig("max_tokens is zero".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(GenerationError::InvalidConfig("timeout_ms is zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GenerationConfig {
        GenerationConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn default_is_valid_with_key() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = GenerationConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let config = GenerationConfig {
            temperature: 3.5,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let config = GenerationConfig {
            max_tokens: 0,
            ..valid()
        };
        assert!(config.validate().is_err());
    }
}
