//! Deepgram streaming recognition
//!
//! Opens a WebSocket to the Deepgram listen API, trying a list of model
//! candidates derived from the language hint until one connects. Caller
//! audio goes out as binary PCM16 frames; both wire generations coming back
//! are normalized into [`RecognitionEvent`]s: the v2 `TurnInfo` turn-taking
//! messages (flux, nova-3) and the older v1 `Results` shape (nova-2), for
//! which a speech start is inferred once per utterance.

use bytes::Bytes;
use domain::RecognitionEvent;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, client::IntoClientRequest, http::HeaderValue},
};
use tracing::{debug, info, instrument, warn};

use crate::{config::SpeechConfig, error::SpeechError};

/// One connection attempt: model plus the language parameter it takes
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    model: &'static str,
    language: Option<String>,
}

/// Build the candidate list for a language hint, best first
///
/// Flux is English-only and takes no language parameter; nova models carry
/// the hint through. A multilingual hint prefers the nova code-switching
/// models, English prefers flux for its turn-taking events.
fn candidates(language_hint: Option<&str>) -> Vec<Candidate> {
    let hint = language_hint.unwrap_or("multi").to_ascii_lowercase();
    match hint.as_str() {
        "auto" | "multi" => vec![
            Candidate {
                model: "nova-2-general",
                language: Some("multi".to_string()),
            },
            Candidate {
                model: "nova-3-general",
                language: Some("multi".to_string()),
            },
            Candidate {
                model: "flux-general-en",
                language: None,
            },
        ],
        "en" | "en-us" => vec![
            Candidate {
                model: "flux-general-en",
                language: None,
            },
            Candidate {
                model: "nova-3-general",
                language: Some("en".to_string()),
            },
            Candidate {
                model: "nova-2-general",
                language: Some("en".to_string()),
            },
        ],
        other => vec![
            Candidate {
                model: "nova-3-general",
                language: Some(other.to_string()),
            },
            Candidate {
                model: "nova-2-general",
                language: Some(other.to_string()),
            },
            Candidate {
                model: "flux-general-en",
                language: None,
            },
        ],
    }
}

/// Listen URL for a candidate; nova-2 speaks the v1 protocol, the rest v2
fn ws_url(base: &str, candidate: &Candidate, sample_rate_hz: u32) -> String {
    let version = if candidate.model.starts_with("nova-2") {
        "v1"
    } else {
        "v2"
    };
    let mut url = format!(
        "{}/{}/listen?encoding=linear16&sample_rate={}&model={}",
        base.trim_end_matches('/'),
        version,
        sample_rate_hz,
        candidate.model
    );
    if let Some(language) = &candidate.language {
        url.push_str("&language=");
        url.push_str(language);
    }
    if version == "v1" {
        url.push_str("&interim_results=true&channels=1");
    }
    url
}

fn effective_language(candidate: &Candidate) -> String {
    candidate
        .language
        .clone()
        .unwrap_or_else(|| "en".to_string())
}

/// Connector for Deepgram streaming recognition sessions
#[derive(Debug, Clone)]
pub struct DeepgramStt {
    config: SpeechConfig,
}

impl DeepgramStt {
    /// Create a connector
    #[must_use]
    pub const fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// Open a streaming session, trying each candidate in order
    ///
    /// # Errors
    /// Returns [`SpeechError::Unavailable`] when recognition is not
    /// configured or every candidate failed to connect.
    #[instrument(skip(self))]
    pub async fn connect(
        &self,
        sample_rate_hz: u32,
        language_hint: Option<&str>,
    ) -> Result<DeepgramSession, SpeechError> {
        let Some(api_key) = self
            .config
            .deepgram_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
        else {
            return Err(SpeechError::Unavailable(
                "recognition API key not configured".to_string(),
            ));
        };

        let auth = HeaderValue::from_str(&format!("Token {api_key}"))
            .map_err(|e| SpeechError::Configuration(e.to_string()))?;

        for candidate in candidates(language_hint) {
            let url = ws_url(&self.config.deepgram_ws_url, &candidate, sample_rate_hz);
            let mut request = match url.into_client_request() {
                Ok(request) => request,
                Err(err) => {
                    warn!(model = candidate.model, error = %err, "Bad candidate URL");
                    continue;
                },
            };
            request.headers_mut().insert("Authorization", auth.clone());

            match connect_async(request).await {
                Ok((socket, _response)) => {
                    info!(
                        model = candidate.model,
                        language = ?candidate.language,
                        "Recognition session connected"
                    );
                    return Ok(DeepgramSession::spawn(socket, effective_language(&candidate)));
                },
                Err(err) => {
                    warn!(model = candidate.model, error = %err, "Recognition candidate failed");
                },
            }
        }

        Err(SpeechError::Unavailable(
            "all recognition backends failed".to_string(),
        ))
    }
}

#[derive(Debug)]
enum WriterCommand {
    Audio(Bytes),
    Close,
}

/// A live streaming recognition session
///
/// Dropping the session closes the socket without flushing; call
/// [`close`](Self::close) first to let pending transcripts finalize.
#[derive(Debug)]
pub struct DeepgramSession {
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    events_rx: Option<mpsc::UnboundedReceiver<RecognitionEvent>>,
}

impl DeepgramSession {
    fn spawn(socket: WebSocketStream<MaybeTlsStream<TcpStream>>, language: String) -> Self {
        let (mut sink, mut source) = socket.split();
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(command) = writer_rx.recv().await {
                match command {
                    WriterCommand::Audio(frame) => {
                        if sink.send(Message::Binary(frame.to_vec())).await.is_err() {
                            break;
                        }
                    },
                    WriterCommand::Close => {
                        let close = r#"{"type":"CloseStream"}"#.to_string();
                        let _ = sink.send(Message::Text(close)).await;
                        let _ = sink.close().await;
                        break;
                    },
                }
            }
        });

        tokio::spawn(async move {
            let mut in_utterance = false;
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(raw)) => {
                        for event in translate_message(&raw, &language, &mut in_utterance) {
                            if events_tx.send(event).is_err() {
                                return;
                            }
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {},
                    Err(err) => {
                        warn!(error = %err, "Recognition socket error");
                        break;
                    },
                }
            }
            let _ = events_tx.send(RecognitionEvent::SessionClosed);
        });

        Self {
            writer_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Submit one frame of raw PCM16 audio
    ///
    /// # Errors
    /// Returns [`SpeechError::SessionClosed`] once the socket writer is gone.
    pub fn submit_audio(&self, frame: Bytes) -> Result<(), SpeechError> {
        if frame.is_empty() {
            return Ok(());
        }
        self.writer_tx
            .send(WriterCommand::Audio(frame))
            .map_err(|_| SpeechError::SessionClosed)
    }

    /// Take the normalized event queue; `None` after the first call
    ///
    /// The queue yields [`RecognitionEvent::SessionClosed`] as its last event.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<RecognitionEvent>> {
        self.events_rx.take()
    }

    /// Close the session, asking the service to flush pending transcripts
    pub fn close(&self) {
        let _ = self.writer_tx.send(WriterCommand::Close);
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    TurnInfo {
        event: String,
        #[serde(default)]
        transcript: String,
    },
    Results {
        #[serde(default)]
        is_final: bool,
        #[serde(default)]
        speech_final: bool,
        #[serde(default)]
        channel: WireChannel,
    },
    Metadata {
        #[serde(default)]
        request_id: Option<String>,
    },
    Error {
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
struct WireChannel {
    #[serde(default)]
    alternatives: Vec<WireAlternative>,
}

#[derive(Debug, Deserialize)]
struct WireAlternative {
    #[serde(default)]
    transcript: String,
}

/// Normalize one wire message into recognition events
///
/// `in_utterance` tracks v1 utterance state so a speech start is inferred
/// exactly once per utterance.
fn translate_message(raw: &str, language: &str, in_utterance: &mut bool) -> Vec<RecognitionEvent> {
    let message = match serde_json::from_str::<WireMessage>(raw) {
        Ok(message) => message,
        Err(err) => {
            debug!(error = %err, "Unparseable recognition message");
            return Vec::new();
        },
    };

    match message {
        WireMessage::TurnInfo { event, transcript } => match event.as_str() {
            "StartOfTurn" => vec![RecognitionEvent::SpeechStarted],
            "Update" | "EagerEndOfTurn" => {
                if transcript.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![RecognitionEvent::partial(transcript)]
                }
            },
            "EndOfTurn" => {
                let mut events = Vec::new();
                if !transcript.trim().is_empty() {
                    events.push(RecognitionEvent::final_transcript(transcript, language));
                }
                events.push(RecognitionEvent::UtteranceEnded);
                events
            },
            // TurnResumed and any future events carry no state change.
            _ => Vec::new(),
        },
        WireMessage::Results {
            is_final,
            speech_final,
            channel,
        } => {
            let transcript = channel
                .alternatives
                .into_iter()
                .next()
                .map(|alt| alt.transcript)
                .unwrap_or_default();
            let trimmed = transcript.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }

            let mut events = Vec::new();
            if !*in_utterance {
                events.push(RecognitionEvent::SpeechStarted);
                *in_utterance = true;
            }
            if is_final || speech_final {
                events.push(RecognitionEvent::final_transcript(trimmed, language));
                events.push(RecognitionEvent::UtteranceEnded);
                *in_utterance = false;
            } else {
                events.push(RecognitionEvent::partial(trimmed));
            }
            events
        },
        WireMessage::Metadata { request_id } => {
            debug!(?request_id, "Recognition session metadata");
            Vec::new()
        },
        WireMessage::Error { description } => {
            warn!(?description, "Recognition service error");
            Vec::new()
        },
        WireMessage::Unknown => Vec::new(),
    }
}
