//! Synthesis port - Interface for streaming text-to-speech

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for starting streaming speech synthesis
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    /// Start synthesizing the given text
    ///
    /// # Errors
    /// Returns [`ApplicationError::Synthesis`] when no synthesis backend
    /// could be reached at all; failures after the stream has started are
    /// reported by the stream ending early.
    async fn speak(&self, text: String) -> Result<Box<dyn SynthesisStream>, ApplicationError>;
}

/// An in-progress synthesis producing audio chunks
///
/// Guarantee: once [`cancel`](Self::cancel) has been called,
/// [`next_chunk`](Self::next_chunk) returns `None` forever, even if provider
/// chunks are still buffered.
#[async_trait]
pub trait SynthesisStream: Send {
    /// Pull the next audio chunk; `None` when the synthesis is done or cancelled
    async fn next_chunk(&mut self) -> Option<Bytes>;

    /// Stop the synthesis and discard any buffered audio
    fn cancel(&mut self);
}

impl std::fmt::Debug for dyn SynthesisStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn SynthesisStream")
    }
}
