//! End-to-end turn-taking scenarios against scripted ports
//!
//! Drives the coordinator loop with hand-written port fakes: a recording
//! channel, a generation fake with configurable latency and outcome, and a
//! chunked synthesis fake that honors cancellation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use application::{
    ApplicationError, ConversationChannel, ConversationSession, ConversationSummary,
    CoordinatorConfig, GenerationPort, RecognitionPort, RecognitionSession, RecognitionStream,
    SessionSettings, SynthesisPort, SynthesisStream, TurnCoordinator,
};
use async_trait::async_trait;
use bytes::Bytes;
use domain::{ChannelEvent, ChatMessage, ConversationId, RecognitionEvent, TurnOutcome};
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Channel fake that records every event in order
struct RecordingChannel {
    events: Mutex<Vec<ChannelEvent>>,
}

impl RecordingChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }

    async fn wait_for(&self, pred: impl Fn(&[ChannelEvent]) -> bool) {
        for _ in 0..400 {
            if pred(&self.events()) {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached; events: {:?}", self.events());
    }
}

#[async_trait]
impl ConversationChannel for RecordingChannel {
    async fn send(&self, event: ChannelEvent) -> Result<(), ApplicationError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Generation fake echoing a reply derived from the transcript
struct FakeGeneration {
    delay: Duration,
    fail: bool,
}

impl FakeGeneration {
    fn instant() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self { delay, fail: false }
    }

    fn failing() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: true,
        }
    }
}

#[async_trait]
impl GenerationPort for FakeGeneration {
    async fn generate(
        &self,
        transcript: String,
        _history: Vec<ChatMessage>,
    ) -> Result<String, ApplicationError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.fail {
            return Err(ApplicationError::Generation("request timed out".to_string()));
        }
        Ok(format!("reply to {transcript}"))
    }
}

/// Synthesis stream yielding paced chunks derived from the spoken text
struct ChunkedStream {
    text: String,
    next: usize,
    total: usize,
    delay: Duration,
    cancelled: Arc<AtomicBool>,
}

#[async_trait]
impl SynthesisStream for ChunkedStream {
    async fn next_chunk(&mut self) -> Option<Bytes> {
        if self.cancelled.load(Ordering::SeqCst) || self.next >= self.total {
            return None;
        }
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        let chunk = format!("{}#{}", self.text, self.next);
        self.next += 1;
        Some(Bytes::from(chunk))
    }

    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

struct ChunkedSynthesis {
    chunks: usize,
    delay: Duration,
}

#[async_trait]
impl SynthesisPort for ChunkedSynthesis {
    async fn speak(&self, text: String) -> Result<Box<dyn SynthesisStream>, ApplicationError> {
        Ok(Box::new(ChunkedStream {
            text,
            next: 0,
            total: self.chunks,
            delay: self.delay,
            cancelled: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// Synthesis port whose backend is unreachable
struct FailingSynthesis;

#[async_trait]
impl SynthesisPort for FailingSynthesis {
    async fn speak(&self, _text: String) -> Result<Box<dyn SynthesisStream>, ApplicationError> {
        Err(ApplicationError::Synthesis("no synthesis backend".to_string()))
    }
}

/// Recognition port whose every backend candidate is down
struct DownRecognition;

#[async_trait]
impl RecognitionPort for DownRecognition {
    async fn start(
        &self,
        _sample_rate_hz: u32,
        _language_hint: Option<String>,
    ) -> Result<Box<dyn RecognitionSession>, ApplicationError> {
        Err(ApplicationError::RecognitionUnavailable)
    }
}

struct Harness {
    tx: mpsc::UnboundedSender<RecognitionEvent>,
    handle: JoinHandle<ConversationSummary>,
    channel: Arc<RecordingChannel>,
}

impl Harness {
    fn start(
        generation: impl GenerationPort + 'static,
        synthesis: impl SynthesisPort + 'static,
    ) -> Self {
        let channel = RecordingChannel::new();
        let coordinator = TurnCoordinator::new(
            ConversationId::new(),
            Arc::clone(&channel) as Arc<dyn ConversationChannel>,
            Arc::new(generation),
            Arc::new(synthesis),
            CoordinatorConfig::default(),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let events: RecognitionStream = Box::pin(UnboundedReceiverStream::new(rx));
        let handle = tokio::spawn(coordinator.run(events));
        Self {
            tx,
            handle,
            channel,
        }
    }

    fn send(&self, event: RecognitionEvent) {
        self.tx.send(event).unwrap();
    }

    async fn finish(self) -> ConversationSummary {
        self.tx.send(RecognitionEvent::SessionClosed).unwrap();
        self.handle.await.unwrap()
    }
}

fn audio_chunk_count(events: &[ChannelEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ChannelEvent::AudioChunk { .. }))
        .count()
}

#[tokio::test]
async fn happy_path_turn_streams_reply_audio() {
    let harness = Harness::start(
        FakeGeneration::instant(),
        ChunkedSynthesis {
            chunks: 3,
            delay: Duration::ZERO,
        },
    );

    harness.send(RecognitionEvent::SpeechStarted);
    harness.send(RecognitionEvent::partial("hel"));
    harness.send(RecognitionEvent::final_transcript("hello there", "en"));

    harness
        .channel
        .wait_for(|events| audio_chunk_count(events) == 3)
        .await;

    let events = harness.channel.events();
    let summary = harness.finish().await;

    // Protocol order: speech start, partial, final, reply text, then audio.
    assert!(matches!(events[0], ChannelEvent::SpeechStarted));
    assert!(matches!(events[1], ChannelEvent::PartialTranscript { .. }));
    assert!(matches!(events[2], ChannelEvent::FinalTranscript { .. }));
    assert!(
        matches!(&events[3], ChannelEvent::AgentResponse { text } if text == "reply to hello there")
    );
    assert!(matches!(events[4], ChannelEvent::AudioChunk { .. }));

    assert_eq!(summary.turns.len(), 1);
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Completed);
    assert_eq!(summary.history.len(), 2);
}

#[tokio::test]
async fn barge_in_interrupts_streaming_reply() {
    let harness = Harness::start(
        FakeGeneration::instant(),
        ChunkedSynthesis {
            chunks: 200,
            delay: Duration::from_millis(5),
        },
    );

    harness.send(RecognitionEvent::final_transcript("first question", "en"));
    harness
        .channel
        .wait_for(|events| audio_chunk_count(events) >= 2)
        .await;

    // Caller starts talking over the reply.
    harness.send(RecognitionEvent::SpeechStarted);
    harness
        .channel
        .wait_for(|events| events.iter().any(|e| matches!(e, ChannelEvent::TtsInterrupted)))
        .await;

    // Follow-up question gets a fresh reply.
    harness.send(RecognitionEvent::final_transcript("second question", "en"));
    harness
        .channel
        .wait_for(|events| {
            events.iter().any(
                |e| matches!(e, ChannelEvent::AgentResponse { text } if text == "reply to second question"),
            )
        })
        .await;

    let events = harness.channel.events();
    let interrupted_at = events
        .iter()
        .position(|e| matches!(e, ChannelEvent::TtsInterrupted))
        .unwrap();
    let stale_chunk_after_interrupt = events[interrupted_at..].iter().any(|e| {
        matches!(e, ChannelEvent::AudioChunk { audio }
            if String::from_utf8_lossy(&base64_decode(audio)).contains("first question"))
    });
    assert!(
        !stale_chunk_after_interrupt,
        "audio from the interrupted reply leaked after tts_interrupted"
    );

    // The interruption marker lands before the barge-in is announced, so no
    // event of the follow-up turn can precede it.
    let barge_in_announced = events
        .iter()
        .position(|e| matches!(e, ChannelEvent::SpeechStarted))
        .unwrap();
    assert!(
        interrupted_at < barge_in_announced,
        "tts_interrupted must precede the barge-in speech_started"
    );

    let summary = harness.finish().await;
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Interrupted);
    // The interrupted exchange stays in history alongside the follow-up.
    assert_eq!(summary.history.len(), 4);
}

#[tokio::test]
async fn speech_start_before_completion_discards_result() {
    let harness = Harness::start(
        FakeGeneration::slow(Duration::from_millis(150)),
        ChunkedSynthesis {
            chunks: 3,
            delay: Duration::ZERO,
        },
    );

    harness.send(RecognitionEvent::final_transcript("slow one", "en"));
    sleep(Duration::from_millis(30)).await;
    harness.send(RecognitionEvent::SpeechStarted);
    sleep(Duration::from_millis(200)).await;

    let events = harness.channel.events();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ChannelEvent::AgentResponse { .. })),
        "discarded generation result must not be spoken"
    );

    let summary = harness.finish().await;
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Interrupted);
    assert!(summary.history.is_empty());
}

#[tokio::test]
async fn duplicate_speech_start_is_idempotent() {
    let harness = Harness::start(
        FakeGeneration::instant(),
        ChunkedSynthesis {
            chunks: 1,
            delay: Duration::ZERO,
        },
    );

    harness.send(RecognitionEvent::SpeechStarted);
    harness.send(RecognitionEvent::SpeechStarted);
    harness.send(RecognitionEvent::final_transcript("hello", "en"));

    harness
        .channel
        .wait_for(|events| audio_chunk_count(events) == 1)
        .await;

    let starts = harness
        .channel
        .events()
        .iter()
        .filter(|e| matches!(e, ChannelEvent::SpeechStarted))
        .count();
    assert_eq!(starts, 1);

    let summary = harness.finish().await;
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Completed);
}

#[tokio::test]
async fn blank_transcript_skips_the_turn() {
    let harness = Harness::start(
        FakeGeneration::instant(),
        ChunkedSynthesis {
            chunks: 1,
            delay: Duration::ZERO,
        },
    );

    harness.send(RecognitionEvent::final_transcript("   ", "en"));
    sleep(Duration::from_millis(50)).await;

    let events = harness.channel.events();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ChannelEvent::AgentResponse { .. }))
    );

    let summary = harness.finish().await;
    assert_eq!(summary.turns.len(), 1);
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Skipped);
    assert!(summary.history.is_empty());
}

#[tokio::test]
async fn generation_failure_speaks_fallback_reply() {
    let harness = Harness::start(
        FakeGeneration::failing(),
        ChunkedSynthesis {
            chunks: 2,
            delay: Duration::ZERO,
        },
    );

    harness.send(RecognitionEvent::final_transcript("tell me something", "en"));
    harness
        .channel
        .wait_for(|events| audio_chunk_count(events) == 2)
        .await;

    let fallback = CoordinatorConfig::default().fallback_reply;
    let events = harness.channel.events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ChannelEvent::AgentResponse { text } if *text == fallback))
    );

    let summary = harness.finish().await;
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Completed);
    // Only the caller's message is remembered; the fallback is not.
    assert_eq!(summary.history.len(), 1);
}

#[tokio::test]
async fn synthesis_failure_completes_turn_text_only() {
    let harness = Harness::start(FakeGeneration::instant(), FailingSynthesis);

    harness.send(RecognitionEvent::final_transcript("read me a poem", "en"));
    harness
        .channel
        .wait_for(|events| {
            events.iter().any(
                |e| matches!(e, ChannelEvent::AgentResponse { text } if text == "reply to read me a poem"),
            )
        })
        .await;

    let events = harness.channel.events();
    assert_eq!(
        audio_chunk_count(&events),
        0,
        "a failed synthesis must not produce audio"
    );

    let summary = harness.finish().await;
    assert_eq!(summary.turns.len(), 1);
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Completed);
    // The exchange was accepted before synthesis started; it stays recorded.
    assert_eq!(summary.history.len(), 2);
}

#[tokio::test]
async fn session_close_during_synthesis_interrupts_the_turn() {
    let harness = Harness::start(
        FakeGeneration::instant(),
        ChunkedSynthesis {
            chunks: 200,
            delay: Duration::from_millis(5),
        },
    );

    harness.send(RecognitionEvent::final_transcript("a long story", "en"));
    harness
        .channel
        .wait_for(|events| audio_chunk_count(events) >= 2)
        .await;

    // Close mid-stream; the reply never finished delivery.
    let summary = harness.finish().await;
    assert_eq!(summary.turns.len(), 1);
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Interrupted);
    assert_eq!(summary.history.len(), 2);
}

#[tokio::test]
async fn session_close_after_delivered_reply_keeps_it_completed() {
    let harness = Harness::start(
        FakeGeneration::instant(),
        ChunkedSynthesis {
            chunks: 2,
            delay: Duration::ZERO,
        },
    );

    harness.send(RecognitionEvent::final_transcript("a quick one", "en"));
    harness
        .channel
        .wait_for(|events| audio_chunk_count(events) == 2)
        .await;

    // All audio was delivered; closing now must not demote the turn, even
    // when its completion is still queued behind the close.
    let summary = harness.finish().await;
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Completed);
    assert_eq!(summary.history.len(), 2);
}

#[tokio::test]
async fn recognition_down_leaves_text_path_working() {
    let generation: Arc<dyn GenerationPort> = Arc::new(FakeGeneration::instant());
    let synthesis: Arc<dyn SynthesisPort> = Arc::new(ChunkedSynthesis {
        chunks: 1,
        delay: Duration::ZERO,
    });
    let channel = RecordingChannel::new();

    let session = ConversationSession::start(
        Arc::new(DownRecognition),
        generation,
        synthesis,
        Arc::clone(&channel) as Arc<dyn ConversationChannel>,
        SessionSettings::default(),
        CoordinatorConfig::default(),
    );

    assert!(matches!(
        session.start_recognition().await,
        Err(ApplicationError::RecognitionUnavailable)
    ));

    // Audio frames are dropped silently while recognition is down.
    session
        .submit_audio(Bytes::from_static(&[0u8; 320]))
        .await
        .unwrap();

    session.submit_text("typed question").unwrap();
    channel
        .wait_for(|events| {
            events.iter().any(
                |e| matches!(e, ChannelEvent::AgentResponse { text } if text == "reply to typed question"),
            )
        })
        .await;

    let errors = channel
        .events()
        .iter()
        .filter(|e| matches!(e, ChannelEvent::Error { .. }))
        .count();
    assert_eq!(errors, 1);

    let summary = session.shutdown().await.unwrap();
    assert_eq!(summary.turns[0].outcome(), TurnOutcome::Completed);
}

fn base64_decode(audio: &str) -> Vec<u8> {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    STANDARD.decode(audio).unwrap_or_default()
}
