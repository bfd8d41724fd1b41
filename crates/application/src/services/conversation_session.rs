//! Conversation session - Per-connection wiring around the coordinator
//!
//! Owns the coordinator task for one caller connection, the recognition
//! session feeding it, and the injection path for text-only input. All
//! recognition events, whether they come from the provider session or from
//! [`ConversationSession::submit_text`], flow through a single queue into
//! the coordinator loop.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;
use domain::{ChannelEvent, ConversationId, RecognitionEvent};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, instrument, warn};

use crate::{
    error::ApplicationError,
    ports::{
        ConversationChannel, GenerationPort, RecognitionPort, RecognitionSession,
        RecognitionStream, SynthesisPort,
    },
    services::{
        audio_ingest::AudioIngest,
        turn_coordinator::{ConversationSummary, CoordinatorConfig, TurnCoordinator},
    },
};

/// Per-session audio and language settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Sample rate of the caller's PCM16 audio
    pub sample_rate_hz: u32,
    /// Language hint passed to recognition (e.g., "en", "multi")
    pub language_hint: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            language_hint: None,
        }
    }
}

/// A live conversation bound to one caller connection
pub struct ConversationSession {
    id: ConversationId,
    ingest: Arc<AudioIngest>,
    channel: Arc<dyn ConversationChannel>,
    recognition: Arc<dyn RecognitionPort>,
    settings: SessionSettings,
    event_tx: mpsc::UnboundedSender<RecognitionEvent>,
    recognition_session: Mutex<Option<Arc<dyn RecognitionSession>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    coordinator: Mutex<Option<JoinHandle<ConversationSummary>>>,
    recognition_error_reported: AtomicBool,
}

impl fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationSession")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ConversationSession {
    /// Start a conversation and its coordinator loop
    #[must_use]
    pub fn start(
        recognition: Arc<dyn RecognitionPort>,
        generation: Arc<dyn GenerationPort>,
        synthesis: Arc<dyn SynthesisPort>,
        channel: Arc<dyn ConversationChannel>,
        settings: SessionSettings,
        config: CoordinatorConfig,
    ) -> Self {
        let id = ConversationId::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let events: RecognitionStream = Box::pin(UnboundedReceiverStream::new(event_rx));
        let coordinator =
            TurnCoordinator::new(id, Arc::clone(&channel), generation, synthesis, config);
        let handle = tokio::spawn(coordinator.run(events));

        Self {
            id,
            ingest: Arc::new(AudioIngest::new()),
            channel,
            recognition,
            settings,
            event_tx,
            recognition_session: Mutex::new(None),
            forwarder: Mutex::new(None),
            coordinator: Mutex::new(Some(handle)),
            recognition_error_reported: AtomicBool::new(false),
        }
    }

    /// Identifier of this conversation
    #[must_use]
    pub const fn id(&self) -> ConversationId {
        self.id
    }

    /// Open the streaming recognition session and start piping its events
    ///
    /// On [`ApplicationError::RecognitionUnavailable`] the caller is notified
    /// through the channel exactly once; the conversation stays open for
    /// text-only input either way.
    ///
    /// # Errors
    /// Propagates the port error when the session could not be opened.
    #[instrument(skip(self), fields(conversation_id = %self.id))]
    pub async fn start_recognition(&self) -> Result<(), ApplicationError> {
        let result = self
            .recognition
            .start(self.settings.sample_rate_hz, self.settings.language_hint.clone())
            .await;

        match result {
            Ok(mut session) => {
                let mut events = session.events();
                let session: Arc<dyn RecognitionSession> = Arc::from(session);
                self.ingest.attach(Arc::clone(&session));
                *self.recognition_session.lock() = Some(session);

                let tx = self.event_tx.clone();
                let forwarder = tokio::spawn(async move {
                    while let Some(event) = events.next().await {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                });
                *self.forwarder.lock() = Some(forwarder);
                info!("Recognition session attached");
                Ok(())
            },
            Err(err) => {
                warn!(error = %err, "Could not start recognition");
                if matches!(err, ApplicationError::RecognitionUnavailable)
                    && !self.recognition_error_reported.swap(true, Ordering::SeqCst)
                {
                    let _ = self
                        .channel
                        .send(ChannelEvent::Error {
                            message: "Speech recognition is unavailable right now; text input still works."
                                .to_string(),
                        })
                        .await;
                }
                Err(err)
            },
        }
    }

    /// Submit one frame of caller audio
    ///
    /// # Errors
    /// Propagates recognition-session errors; frames are dropped silently
    /// while no session is attached.
    pub async fn submit_audio(&self, frame: Bytes) -> Result<(), ApplicationError> {
        self.ingest.submit(frame).await
    }

    /// Inject a typed message as if it were a finalized transcript
    ///
    /// # Errors
    /// Returns [`ApplicationError::Internal`] when the coordinator loop has
    /// already stopped.
    pub fn submit_text(&self, text: impl Into<String>) -> Result<(), ApplicationError> {
        self.event_tx
            .send(RecognitionEvent::final_transcript(text, "text"))
            .map_err(|_| ApplicationError::Internal("conversation loop stopped".to_string()))
    }

    /// Tear the conversation down cooperatively
    ///
    /// Closes the recognition session, signals the coordinator to stop, and
    /// waits for it to drain. Returns the conversation summary when the
    /// coordinator was still running.
    #[instrument(skip(self), fields(conversation_id = %self.id))]
    pub async fn shutdown(&self) -> Option<ConversationSummary> {
        self.ingest.detach();

        let session = self.recognition_session.lock().take();
        if let Some(session) = session {
            session.close().await;
        }
        // The forwarder exits on its own once the provider stream ends.
        drop(self.forwarder.lock().take());

        let _ = self.event_tx.send(RecognitionEvent::SessionClosed);

        let handle = self.coordinator.lock().take();
        match handle {
            Some(handle) => handle.await.ok(),
            None => None,
        }
    }
}
