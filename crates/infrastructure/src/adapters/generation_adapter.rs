//! Generation adapter - Reply generation behind the application port

use std::{fmt, sync::Arc};

use ai_core::{GenerationEngine, GenerationRequest};
use application::{ApplicationError, GenerationPort};
use async_trait::async_trait;
use domain::ChatMessage;

/// [`GenerationPort`] backed by a chat-completions engine
pub struct GenerationAdapter {
    engine: Arc<dyn GenerationEngine>,
    system_prompt: Option<String>,
}

impl fmt::Debug for GenerationAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationAdapter")
            .field("system_prompt", &self.system_prompt.is_some())
            .finish_non_exhaustive()
    }
}

impl GenerationAdapter {
    /// Create an adapter over the given engine
    #[must_use]
    pub fn new(engine: Arc<dyn GenerationEngine>, system_prompt: Option<String>) -> Self {
        Self {
            engine,
            system_prompt,
        }
    }
}

#[async_trait]
impl GenerationPort for GenerationAdapter {
    async fn generate(
        &self,
        transcript: String,
        history: Vec<ChatMessage>,
    ) -> Result<String, ApplicationError> {
        let request =
            GenerationRequest::from_history(self.system_prompt.as_deref(), &history, transcript);
        let response = self
            .engine
            .generate(request)
            .await
            .map_err(|err| ApplicationError::Generation(err.to_string()))?;
        Ok(response.content)
    }
}
