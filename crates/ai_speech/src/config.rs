//! Configuration for speech services

use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Configuration for the streaming speech providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Deepgram API key; recognition is disabled when absent
    #[serde(default)]
    pub deepgram_api_key: Option<String>,

    /// Deepgram WebSocket base URL
    #[serde(default = "default_deepgram_ws_url")]
    pub deepgram_ws_url: String,

    /// ElevenLabs API key; synthesis is disabled when absent
    #[serde(default)]
    pub elevenlabs_api_key: Option<String>,

    /// ElevenLabs REST base URL
    #[serde(default = "default_elevenlabs_api_url")]
    pub elevenlabs_api_url: String,

    /// ElevenLabs WebSocket base URL
    #[serde(default = "default_elevenlabs_ws_url")]
    pub elevenlabs_ws_url: String,

    /// Voice used for synthesis
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// Synthesis model
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Sample rate of caller audio submitted to recognition
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Request timeout in milliseconds for REST calls
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_deepgram_ws_url() -> String {
    "wss://api.deepgram.com".to_string()
}

fn default_elevenlabs_api_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_elevenlabs_ws_url() -> String {
    "wss://api.elevenlabs.io".to_string()
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_tts_model() -> String {
    "eleven_multilingual_v2".to_string()
}

const fn default_sample_rate_hz() -> u32 {
    16_000
}

const fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            deepgram_api_key: None,
            deepgram_ws_url: default_deepgram_ws_url(),
            elevenlabs_api_key: None,
            elevenlabs_api_url: default_elevenlabs_api_url(),
            elevenlabs_ws_url: default_elevenlabs_ws_url(),
            voice_id: default_voice_id(),
            tts_model: default_tts_model(),
            sample_rate_hz: default_sample_rate_hz(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SpeechConfig {
    /// Whether streaming recognition is configured
    #[must_use]
    pub fn recognition_enabled(&self) -> bool {
        self.deepgram_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Whether streaming synthesis is configured
    #[must_use]
    pub fn synthesis_enabled(&self) -> bool {
        self.elevenlabs_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`SpeechError::Configuration`] for out-of-range or empty
    /// fields.
    pub fn validate(&self) -> Result<(), SpeechError> {
        if self.voice_id.trim().is_empty() {
            return Err(SpeechError::Configuration("voice_id is empty".to_string()));
        }
        if self.tts_model.trim().is_empty() {
            return Err(SpeechError::Configuration("tts_model is empty".to_string()));
        }
        if self.sample_rate_hz < 8_000 || self.sample_rate_hz > 48_000 {
            return Err(SpeechError::Configuration(format!(
                "sample_rate_hz {} out of range 8000..=48000",
                self.sample_rate_hz
            )));
        }
        if self.timeout_ms == 0 {
            return Err(SpeechError::Configuration("timeout_ms is zero".to_string()));
        }
        Ok(())
    }
}
