//! Synthesis adapter - Streaming TTS behind the application port

use ai_speech::{ElevenLabsSynthesizer, SynthesisHandle};
use application::{ApplicationError, SynthesisPort, SynthesisStream};
use async_trait::async_trait;
use bytes::Bytes;

/// [`SynthesisPort`] backed by the ElevenLabs streaming synthesizer
#[derive(Debug)]
pub struct SynthesisAdapter {
    synthesizer: ElevenLabsSynthesizer,
}

impl SynthesisAdapter {
    /// Create an adapter over the given synthesizer
    #[must_use]
    pub const fn new(synthesizer: ElevenLabsSynthesizer) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl SynthesisPort for SynthesisAdapter {
    async fn speak(&self, text: String) -> Result<Box<dyn SynthesisStream>, ApplicationError> {
        let handle = self
            .synthesizer
            .speak(&text)
            .await
            .map_err(|err| ApplicationError::Synthesis(err.to_string()))?;
        Ok(Box::new(HandleStream { inner: handle }))
    }
}

struct HandleStream {
    inner: SynthesisHandle,
}

#[async_trait]
impl SynthesisStream for HandleStream {
    async fn next_chunk(&mut self) -> Option<Bytes> {
        self.inner.next_chunk().await
    }

    fn cancel(&mut self) {
        self.inner.cancel();
    }
}
