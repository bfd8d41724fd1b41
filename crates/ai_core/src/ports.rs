//! Port definitions for the generation engine

use async_trait::async_trait;
use domain::ChatMessage;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// A message in a generation request (OpenAI-compatible format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for GenerationMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }
}

/// Request for one reply generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Messages in the conversation, oldest first
    pub messages: Vec<GenerationMessage>,
    /// Model override (config default when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Temperature override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Max tokens override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a single-turn request
    pub fn simple(user_message: impl Into<String>) -> Self {
        Self {
            messages: vec![GenerationMessage {
                role: "user".to_string(),
                content: user_message.into(),
            }],
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Build a request from the conversation so far plus the latest utterance
    ///
    /// The system prompt comes first when present, then the history in order,
    /// then the transcript as the final user message.
    pub fn from_history(
        system_prompt: Option<&str>,
        history: &[ChatMessage],
        transcript: impl Into<String>,
    ) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = system_prompt {
            messages.push(GenerationMessage {
                role: "system".to_string(),
                content: prompt.to_string(),
            });
        }
        messages.extend(history.iter().map(GenerationMessage::from));
        messages.push(GenerationMessage {
            role: "user".to_string(),
            content: transcript.into(),
        });
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the model for this request
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature for this request
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Response from a reply generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated reply text
    pub content: String,
    /// Model that produced the reply
    pub model: String,
    /// Finish reason when reported
    pub finish_reason: Option<String>,
}

/// Port for generation engine implementations
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Generate a complete reply
    ///
    /// The future is cancel-safe: dropping it abandons the in-flight HTTP
    /// request.
    ///
    /// # Errors
    /// Returns a [`GenerationError`] on connection, timeout, or protocol
    /// failure. Generation is never retried; one utterance gets one attempt.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}
