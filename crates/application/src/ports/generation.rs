//! Generation port - Interface for producing reply text

use async_trait::async_trait;
use domain::ChatMessage;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for generating the agent's reply to a transcript
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Generate a reply to the transcript given the conversation so far
    ///
    /// The future is cancel-safe: dropping it abandons the in-flight request
    /// and produces no side effects.
    ///
    /// # Arguments
    /// * `transcript` - The caller's finalized utterance
    /// * `history` - Prior messages, oldest first (does not include `transcript`)
    ///
    /// # Errors
    /// Returns [`ApplicationError::Generation`] on provider failure or timeout.
    async fn generate(
        &self,
        transcript: String,
        history: Vec<ChatMessage>,
    ) -> Result<String, ApplicationError>;
}
