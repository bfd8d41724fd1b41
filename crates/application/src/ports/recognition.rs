//! Recognition port - Interface for streaming speech-to-text sessions

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use domain::RecognitionEvent;
use futures::Stream;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Stream of normalized recognition events for one session
///
/// Ends after [`RecognitionEvent::SessionClosed`] has been yielded.
pub type RecognitionStream = Pin<Box<dyn Stream<Item = RecognitionEvent> + Send>>;

/// Port for opening streaming speech-recognition sessions
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecognitionPort: Send + Sync {
    /// Open a streaming recognition session
    ///
    /// # Arguments
    /// * `sample_rate_hz` - Sample rate of the PCM16 audio that will be submitted
    /// * `language_hint` - Optional language hint (e.g., "en", "multi")
    ///
    /// # Errors
    /// Returns [`ApplicationError::RecognitionUnavailable`] when no backend
    /// candidate could be reached.
    async fn start(
        &self,
        sample_rate_hz: u32,
        language_hint: Option<String>,
    ) -> Result<Box<dyn RecognitionSession>, ApplicationError>;
}

/// A live streaming recognition session
///
/// Audio flows in through [`submit_audio`](Self::submit_audio); normalized
/// events flow out through the stream returned by [`events`](Self::events).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecognitionSession: Send + Sync {
    /// Submit a frame of raw PCM16 audio
    ///
    /// # Errors
    /// Returns an error when the session socket is gone.
    async fn submit_audio(&self, frame: Bytes) -> Result<(), ApplicationError>;

    /// Take the event stream for this session
    ///
    /// May be called once; subsequent calls return an empty stream.
    fn events(&mut self) -> RecognitionStream;

    /// Close the session, flushing any pending transcript
    async fn close(&self);
}

impl std::fmt::Debug for dyn RecognitionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn RecognitionSession")
    }
}
