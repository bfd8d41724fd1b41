//! OpenAI-compatible chat-completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::GenerationConfig,
    error::GenerationError,
    ports::{GenerationEngine, GenerationRequest, GenerationResponse},
};

/// Generation engine backed by an OpenAI-compatible chat-completions API
#[derive(Debug)]
pub struct OpenAiGenerator {
    client: Client,
    config: GenerationConfig,
}

impl OpenAiGenerator {
    /// Create a new generator
    ///
    /// # Errors
    /// Returns [`GenerationError::InvalidConfig`] for a bad configuration and
    /// [`GenerationError::ConnectionFailed`] when the HTTP client cannot be
    /// built.
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GenerationError::ConnectionFailed(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            "Initialized generation engine"
        );

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn resolve_model<'a>(&'a self, request: &'a GenerationRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.config.model)
    }
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatApiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatApiMessage {
    role: String,
    content: String,
}

/// Chat-completions response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Error envelope returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

fn map_error_status(status: StatusCode, body: &str) -> GenerationError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error)
        .ok();

    if status == StatusCode::TOO_MANY_REQUESTS
        || detail
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .is_some_and(|code| code == "rate_limit_exceeded")
    {
        return GenerationError::RateLimited;
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let message = detail.map_or_else(|| body.to_string(), |e| e.message);
        return GenerationError::Unauthorized(message);
    }
    let message = detail.map_or_else(|| body.to_string(), |e| e.message);
    GenerationError::ServerError(format!("Status {status}: {message}"))
}

#[async_trait]
impl GenerationEngine for OpenAiGenerator {
    #[instrument(skip(self, request), fields(model = %self.resolve_model(&request), messages = request.messages.len()))]
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let body = ChatCompletionRequest {
            model: self.resolve_model(&request).to_string(),
            messages: request
                .messages
                .iter()
                .map(|m| ChatApiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
        };

        debug!("Sending chat completion request");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Generation request failed");
            return Err(map_error_status(status, &body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".to_string()))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| GenerationError::InvalidResponse("choice has no content".to_string()))?;

        debug!(chars = content.len(), "Generation completed");

        Ok(GenerationResponse {
            content,
            model: completion.model,
            finish_reason: choice.finish_reason,
        })
    }
}
