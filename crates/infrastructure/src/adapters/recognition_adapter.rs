//! Recognition adapter - Streaming STT behind the application port

use ai_speech::{DeepgramSession, DeepgramStt, SpeechConfig, SpeechError};
use application::{ApplicationError, RecognitionPort, RecognitionSession, RecognitionStream};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

/// [`RecognitionPort`] backed by the Deepgram streaming connector
#[derive(Debug)]
pub struct RecognitionAdapter {
    stt: DeepgramStt,
}

impl RecognitionAdapter {
    /// Create an adapter over the given speech configuration
    #[must_use]
    pub const fn new(config: SpeechConfig) -> Self {
        Self {
            stt: DeepgramStt::new(config),
        }
    }
}

#[async_trait]
impl RecognitionPort for RecognitionAdapter {
    async fn start(
        &self,
        sample_rate_hz: u32,
        language_hint: Option<String>,
    ) -> Result<Box<dyn RecognitionSession>, ApplicationError> {
        match self.stt.connect(sample_rate_hz, language_hint.as_deref()).await {
            Ok(session) => Ok(Box::new(StreamingSession { inner: session })),
            Err(SpeechError::Unavailable(reason)) => {
                warn!(reason = %reason, "No recognition backend reachable");
                Err(ApplicationError::RecognitionUnavailable)
            },
            Err(err) => Err(ApplicationError::Internal(err.to_string())),
        }
    }
}

struct StreamingSession {
    inner: DeepgramSession,
}

#[async_trait]
impl RecognitionSession for StreamingSession {
    async fn submit_audio(&self, frame: Bytes) -> Result<(), ApplicationError> {
        self.inner
            .submit_audio(frame)
            .map_err(|err| ApplicationError::Internal(err.to_string()))
    }

    fn events(&mut self) -> RecognitionStream {
        match self.inner.take_events() {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => Box::pin(futures::stream::empty()),
        }
    }

    async fn close(&self) {
        self.inner.close();
    }
}
