//! Turn coordinator - The turn-taking state machine with barge-in
//!
//! One coordinator runs per conversation, as a single `select!`-driven loop
//! consuming the recognition event stream plus an internal channel of
//! reply-task completions. All conversation state lives inside the loop:
//! the speaking state, the append-only history, the turn list, and at most
//! one active reply task at a time.
//!
//! Reply work happens in two spawned phases. Generation runs under a
//! cancellation token and reports its result back into the loop, where it is
//! accepted or discarded; acceptance appends the (caller, agent) exchange to
//! history and starts the synthesis phase. The synthesis task is the only
//! sender of audio chunks, so cancelling it and letting it emit the
//! interruption marker itself preserves per-turn event order.

use std::{fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use domain::{
    ChannelEvent, ChatMessage, ConversationHistory, ConversationId, ConversationTurn,
    RecognitionEvent, SpeakingState, TurnOutcome,
};
use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::ports::{ConversationChannel, GenerationPort, RecognitionStream, SynthesisPort};

/// Coordinator settings
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Reply spoken when generation fails
    pub fallback_reply: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            fallback_reply:
                "Sorry, I had trouble coming up with an answer. Could you say that again?"
                    .to_string(),
        }
    }
}

/// Final state of a conversation after its coordinator loop has returned
#[derive(Debug)]
pub struct ConversationSummary {
    /// The committed message history
    pub history: ConversationHistory,
    /// All turns with their recorded outcomes
    pub turns: Vec<ConversationTurn>,
}

/// Which phase of the reply pipeline the active task is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyPhase {
    Generating,
    Speaking,
}

/// The single in-flight reply, if any
struct ActiveReplyTask {
    seq: u64,
    phase: ReplyPhase,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Completion events reported by spawned reply tasks back into the loop
#[derive(Debug)]
enum ReplyTaskEvent {
    GenerationFinished {
        seq: u64,
        result: Result<String, String>,
    },
    SynthesisEnded {
        seq: u64,
        error: Option<String>,
    },
}

/// The per-conversation turn-taking state machine
pub struct TurnCoordinator {
    id: ConversationId,
    channel: Arc<dyn ConversationChannel>,
    generation: Arc<dyn GenerationPort>,
    synthesis: Arc<dyn SynthesisPort>,
    config: CoordinatorConfig,
    history: ConversationHistory,
    turns: Vec<ConversationTurn>,
    speaking: SpeakingState,
    active: Option<ActiveReplyTask>,
    last_seq: u64,
    task_tx: mpsc::UnboundedSender<ReplyTaskEvent>,
    task_rx: mpsc::UnboundedReceiver<ReplyTaskEvent>,
}

impl fmt::Debug for TurnCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnCoordinator")
            .field("id", &self.id)
            .field("speaking", &self.speaking)
            .field("last_seq", &self.last_seq)
            .finish_non_exhaustive()
    }
}

impl TurnCoordinator {
    /// Create a coordinator for one conversation
    #[must_use]
    pub fn new(
        id: ConversationId,
        channel: Arc<dyn ConversationChannel>,
        generation: Arc<dyn GenerationPort>,
        synthesis: Arc<dyn SynthesisPort>,
        config: CoordinatorConfig,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        Self {
            id,
            channel,
            generation,
            synthesis,
            config,
            history: ConversationHistory::new(id),
            turns: Vec::new(),
            speaking: SpeakingState::Listening,
            active: None,
            last_seq: 0,
            task_tx,
            task_rx,
        }
    }

    /// Drive the conversation until the recognition stream closes
    ///
    /// Recognition events are polled before reply-task completions, so a
    /// speech start that arrives first always wins the race against a
    /// completion for the same instant.
    #[instrument(skip(self, events), fields(conversation_id = %self.id))]
    pub async fn run(mut self, mut events: RecognitionStream) -> ConversationSummary {
        info!("Conversation started");
        loop {
            tokio::select! {
                biased;
                event = events.next() => {
                    match event {
                        Some(RecognitionEvent::SessionClosed) | None => break,
                        Some(event) => self.handle_recognition_event(event).await,
                    }
                }
                Some(task_event) = self.task_rx.recv() => {
                    self.handle_task_event(task_event).await;
                }
            }
        }
        self.teardown().await;
        info!(turns = self.turns.len(), "Conversation closed");
        ConversationSummary {
            history: self.history,
            turns: self.turns,
        }
    }

    async fn handle_recognition_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::SpeechStarted => self.on_speech_started().await,
            RecognitionEvent::PartialTranscript { text } => {
                self.send(ChannelEvent::PartialTranscript { text }).await;
            },
            RecognitionEvent::UtteranceEnded => {
                self.speaking = SpeakingState::Listening;
                self.send(ChannelEvent::UtteranceEnd).await;
            },
            RecognitionEvent::FinalTranscript { text, language } => {
                self.on_final_transcript(text, language).await;
            },
            // Terminal; handled by the run loop.
            RecognitionEvent::SessionClosed => {},
        }
    }

    async fn handle_task_event(&mut self, event: ReplyTaskEvent) {
        match event {
            ReplyTaskEvent::GenerationFinished { seq, result } => {
                self.on_generation_finished(seq, result).await;
            },
            ReplyTaskEvent::SynthesisEnded { seq, error } => {
                self.on_synthesis_ended(seq, error);
            },
        }
    }

    async fn on_speech_started(&mut self) {
        if self.speaking.is_caller_speaking() {
            debug!("Duplicate speech start, already tracking caller speech");
            return;
        }
        self.speaking = SpeakingState::CallerSpeaking;
        self.cancel_active_reply("caller barge-in").await;
        self.send(ChannelEvent::SpeechStarted).await;
    }

    async fn on_final_transcript(&mut self, text: String, language: String) {
        self.speaking = SpeakingState::Listening;
        self.send(ChannelEvent::FinalTranscript {
            text: text.clone(),
            language,
        })
        .await;

        if text.trim().is_empty() {
            let seq = self.next_seq();
            let mut turn = ConversationTurn::new(seq, text);
            if let Err(err) = turn.finish(TurnOutcome::Skipped) {
                debug!(%err, "Turn outcome already recorded");
            }
            self.turns.push(turn);
            debug!(seq, "Blank transcript, turn skipped");
            return;
        }

        // A new utterance supersedes whatever reply is still in flight.
        self.cancel_active_reply("superseded by new transcript").await;

        let seq = self.next_seq();
        self.turns.push(ConversationTurn::new(seq, text.clone()));
        self.spawn_generation(seq, text);
    }

    async fn on_generation_finished(&mut self, seq: u64, result: Result<String, String>) {
        if self.active.as_ref().map(|task| task.seq) != Some(seq) {
            debug!(seq, "Discarding stale generation result");
            return;
        }
        if self.speaking.is_caller_speaking() {
            // The completion raced a barge-in; the caller wins.
            debug!(seq, "Discarding generation result, caller is speaking");
            self.cancel_active_reply("caller speaking at completion").await;
            return;
        }

        let reply = match result {
            Ok(reply) => {
                let transcript = self.turn_transcript(seq);
                self.history.push_exchange(transcript, reply.clone());
                if let Some(turn) = self.turn_mut(seq) {
                    turn.set_reply(reply.clone());
                }
                reply
            },
            Err(err) => {
                warn!(seq, error = %err, "Generation failed, using fallback reply");
                let transcript = self.turn_transcript(seq);
                self.history.push(ChatMessage::user(transcript));
                self.config.fallback_reply.clone()
            },
        };

        self.send(ChannelEvent::AgentResponse {
            text: reply.clone(),
        })
        .await;
        self.spawn_synthesis(seq, reply);
    }

    fn on_synthesis_ended(&mut self, seq: u64, error: Option<String>) {
        if self.active.as_ref().map(|task| task.seq) != Some(seq) {
            debug!(seq, "Ignoring synthesis end for superseded turn");
            return;
        }
        self.active = None;
        if let Some(err) = error {
            warn!(seq, error = %err, "Synthesis failed, turn completed text-only");
        }
        self.finish_turn(seq, TurnOutcome::Completed);
        info!(seq, "Turn completed");
    }

    /// Cancel the in-flight reply and record the turn as interrupted
    ///
    /// Waits for the cancelled task to wind down, so the synthesis phase has
    /// emitted its interruption marker before any event of a later turn goes
    /// out. A completion the task already queued arrives stale afterwards and
    /// is discarded.
    async fn cancel_active_reply(&mut self, reason: &str) {
        if let Some(task) = self.active.take() {
            info!(seq = task.seq, phase = ?task.phase, reason, "Cancelling active reply");
            task.cancel.cancel();
            let _ = task.handle.await;
            self.finish_turn(task.seq, TurnOutcome::Interrupted);
        }
    }

    fn spawn_generation(&mut self, seq: u64, transcript: String) {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let generation = Arc::clone(&self.generation);
        let history = self.history.as_slice().to_vec();
        let tx = self.task_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(seq, "Generation cancelled");
                }
                result = generation.generate(transcript, history) => {
                    let _ = tx.send(ReplyTaskEvent::GenerationFinished {
                        seq,
                        result: result.map_err(|err| err.to_string()),
                    });
                }
            }
        });

        self.active = Some(ActiveReplyTask {
            seq,
            phase: ReplyPhase::Generating,
            cancel,
            handle,
        });
        debug!(seq, "Reply generation started");
    }

    fn spawn_synthesis(&mut self, seq: u64, text: String) {
        let Some(task) = self.active.as_mut() else {
            return;
        };
        let token = task.cancel.clone();
        let synthesis = Arc::clone(&self.synthesis);
        let channel = Arc::clone(&self.channel);
        let tx = self.task_tx.clone();

        let handle = tokio::spawn(async move {
            let mut stream = match synthesis.speak(text).await {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = tx.send(ReplyTaskEvent::SynthesisEnded {
                        seq,
                        error: Some(err.to_string()),
                    });
                    return;
                },
            };
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        stream.cancel();
                        let _ = channel.send(ChannelEvent::TtsInterrupted).await;
                        debug!(seq, "Synthesis interrupted");
                        return;
                    }
                    chunk = stream.next_chunk() => match chunk {
                        Some(bytes) => {
                            let event = ChannelEvent::AudioChunk {
                                audio: BASE64.encode(&bytes),
                            };
                            if channel.send(event).await.is_err() {
                                break;
                            }
                        },
                        None => break,
                    }
                }
            }
            let _ = tx.send(ReplyTaskEvent::SynthesisEnded { seq, error: None });
        });

        task.phase = ReplyPhase::Speaking;
        // The generation phase has already finished; its handle is done.
        drop(std::mem::replace(&mut task.handle, handle));
        debug!(seq, "Reply synthesis started");
    }

    async fn teardown(&mut self) {
        let Some(task) = self.active.take() else {
            while let Ok(event) = self.task_rx.try_recv() {
                debug!(?event, "Dropping task event during teardown");
            }
            return;
        };

        task.cancel.cancel();
        let seq = task.seq;
        let _ = task.handle.await;

        // The reply may have finished delivery just before shutdown; its
        // completion is then still queued and the turn counts as completed.
        let mut completed = false;
        while let Ok(event) = self.task_rx.try_recv() {
            if let ReplyTaskEvent::SynthesisEnded { seq: ended, .. } = event {
                if ended == seq {
                    completed = true;
                }
            }
        }
        let outcome = if completed {
            TurnOutcome::Completed
        } else {
            TurnOutcome::Interrupted
        };
        self.finish_turn(seq, outcome);
    }

    fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    fn turn_mut(&mut self, seq: u64) -> Option<&mut ConversationTurn> {
        self.turns.iter_mut().find(|turn| turn.seq == seq)
    }

    fn turn_transcript(&self, seq: u64) -> String {
        self.turns
            .iter()
            .find(|turn| turn.seq == seq)
            .map(|turn| turn.transcript.clone())
            .unwrap_or_default()
    }

    fn finish_turn(&mut self, seq: u64, outcome: TurnOutcome) {
        if let Some(turn) = self.turn_mut(seq) {
            if let Err(err) = turn.finish(outcome) {
                debug!(%err, "Turn outcome already recorded");
            }
        }
    }

    async fn send(&self, event: ChannelEvent) {
        if let Err(err) = self.channel.send(event).await {
            debug!(%err, "Channel send failed");
        }
    }
}
