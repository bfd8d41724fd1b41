//! Runtime configuration aggregating the provider configs

use ai_core::GenerationConfig;
use ai_speech::SpeechConfig;
use application::ApplicationError;
use serde::{Deserialize, Serialize};

/// Complete configuration for one Voicewire deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Speech provider settings (recognition and synthesis)
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Generation backend settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Language hint for recognition sessions (e.g., "en", "multi")
    #[serde(default)]
    pub language_hint: Option<String>,

    /// Reply spoken when generation fails; a default apology when absent
    #[serde(default)]
    pub fallback_reply: Option<String>,
}

impl RuntimeConfig {
    /// Validate all provider configurations
    ///
    /// # Errors
    /// Returns [`ApplicationError::Configuration`] for the first invalid
    /// field found.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        self.speech
            .validate()
            .map_err(|err| ApplicationError::Configuration(err.to_string()))?;
        self.generation
            .validate()
            .map_err(|err| ApplicationError::Configuration(err.to_string()))?;
        Ok(())
    }
}
