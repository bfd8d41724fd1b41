//! Audio ingest - Forwards caller audio frames to the recognition session
//!
//! The transport hands PCM16 frames to [`AudioIngest::submit`] as they
//! arrive. Frames received while no recognition session is attached are
//! dropped silently; callers can keep streaming audio while recognition is
//! down without tearing the conversation.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use crate::{error::ApplicationError, ports::RecognitionSession};

/// Forwarding path from the transport to the active recognition session
pub struct AudioIngest {
    session: Mutex<Option<Arc<dyn RecognitionSession>>>,
}

impl fmt::Debug for AudioIngest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioIngest")
            .field("attached", &self.session.lock().is_some())
            .finish()
    }
}

impl AudioIngest {
    /// Create an ingest with no session attached
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    /// Attach the recognition session that should receive audio
    pub fn attach(&self, session: Arc<dyn RecognitionSession>) {
        *self.session.lock() = Some(session);
    }

    /// Detach the current session; subsequent frames are dropped
    pub fn detach(&self) {
        *self.session.lock() = None;
    }

    /// Submit one frame of raw PCM16 audio
    ///
    /// # Errors
    /// Propagates the session error when the attached session rejects the
    /// frame. Frames submitted with no session attached succeed as no-ops.
    pub async fn submit(&self, frame: Bytes) -> Result<(), ApplicationError> {
        let session = self.session.lock().clone();
        match session {
            Some(session) => session.submit_audio(frame).await,
            None => {
                trace!(bytes = frame.len(), "Dropping audio frame, no recognition session");
                Ok(())
            },
        }
    }
}

impl Default for AudioIngest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockRecognitionSession;

    #[tokio::test]
    async fn frames_without_session_are_dropped() {
        let ingest = AudioIngest::new();
        let result = ingest.submit(Bytes::from_static(&[0, 1, 2])).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn frames_reach_attached_session() {
        let mut session = MockRecognitionSession::new();
        session
            .expect_submit_audio()
            .times(1)
            .returning(|_| Ok(()));

        let ingest = AudioIngest::new();
        ingest.attach(Arc::new(session));
        ingest.submit(Bytes::from_static(&[0, 1])).await.unwrap();
    }

    #[tokio::test]
    async fn detach_stops_forwarding() {
        let mut session = MockRecognitionSession::new();
        session.expect_submit_audio().times(0);

        let ingest = AudioIngest::new();
        ingest.attach(Arc::new(session));
        ingest.detach();
        ingest.submit(Bytes::from_static(&[7])).await.unwrap();
    }
}
