//! ElevenLabs streaming synthesis
//!
//! Each reply gets its own WebSocket to the multi-stream-input endpoint:
//! voice settings and the text go out, audio frames come back as base64
//! JSON or raw binary. A pump task feeds the chunks into a bounded queue
//! read through [`SynthesisHandle`]. When the socket fails or yields no
//! audio at all, the pump falls back to one non-streaming REST call so a
//! reply never fails silently just because streaming did.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Message, client::IntoClientRequest, http::HeaderValue},
};
use tracing::{debug, instrument, warn};

use crate::{config::SpeechConfig, error::SpeechError};

const CHUNK_QUEUE_DEPTH: usize = 32;
const CONTEXT_ID: &str = "turn";

/// Streaming synthesizer backed by the ElevenLabs API
#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl ElevenLabsSynthesizer {
    /// Create a synthesizer
    ///
    /// # Errors
    /// Returns [`SpeechError::Configuration`] for an invalid configuration
    /// and [`SpeechError::ConnectionFailed`] when the HTTP client cannot be
    /// built.
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SpeechError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}/multi-stream-input?model_id={}&output_format=mp3_44100_128&optimize_streaming_latency=3&auto_mode=true",
            self.config.elevenlabs_ws_url.trim_end_matches('/'),
            self.config.voice_id,
            self.config.tts_model
        )
    }

    fn rest_url(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.elevenlabs_api_url.trim_end_matches('/'),
            self.config.voice_id
        )
    }

    fn api_key(&self) -> Result<&str, SpeechError> {
        self.config
            .elevenlabs_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                SpeechError::Unavailable("synthesis API key not configured".to_string())
            })
    }

    /// Start synthesizing `text`, returning the chunk stream handle
    ///
    /// # Errors
    /// Returns [`SpeechError::Unavailable`] when synthesis is not
    /// configured. Failures after this point surface as the stream ending
    /// early (after the REST fallback has been tried).
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn speak(&self, text: &str) -> Result<SynthesisHandle, SpeechError> {
        self.api_key()?;

        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_QUEUE_DEPTH);
        let cancelled = Arc::new(AtomicBool::new(false));

        let this = self.clone();
        let text = text.to_string();
        let flag = Arc::clone(&cancelled);
        tokio::spawn(async move {
            this.pump(text, chunk_tx, flag).await;
        });

        Ok(SynthesisHandle {
            chunk_rx,
            cancelled,
        })
    }

    async fn pump(&self, text: String, tx: mpsc::Sender<Bytes>, cancelled: Arc<AtomicBool>) {
        let streamed = self.pump_stream(&text, &tx, &cancelled).await;
        match streamed {
            Ok(total) if total > 0 => {
                debug!(bytes = total, "Streaming synthesis finished");
                return;
            },
            Ok(_) => warn!("Streaming synthesis produced no audio, falling back to REST"),
            Err(err) => {
                warn!(error = %err, "Streaming synthesis failed, falling back to REST");
            },
        }

        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        match self.synthesize_all(&text).await {
            Ok(audio) => {
                let _ = tx.send(audio).await;
            },
            Err(err) => {
                // The reply stays text-only; the handle just ends.
                warn!(error = %err, "REST synthesis fallback failed");
            },
        }
    }

    async fn pump_stream(
        &self,
        text: &str,
        tx: &mpsc::Sender<Bytes>,
        cancelled: &AtomicBool,
    ) -> Result<usize, SpeechError> {
        let api_key = self.api_key()?;
        let auth = HeaderValue::from_str(api_key)
            .map_err(|e| SpeechError::Configuration(e.to_string()))?;

        let mut request = self
            .stream_url()
            .into_client_request()
            .map_err(|e| SpeechError::Configuration(e.to_string()))?;
        request.headers_mut().insert("xi-api-key", auth);

        let (socket, _response) = connect_async(request).await?;
        let (mut sink, mut source) = socket.split();

        let settings = json!({
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 },
            "context_id": CONTEXT_ID,
        });
        sink.send(Message::Text(settings.to_string())).await?;
        sink.send(Message::Text(
            json!({ "text": text, "context_id": CONTEXT_ID }).to_string(),
        ))
        .await?;
        sink.send(Message::Text(
            json!({ "flush": true, "context_id": CONTEXT_ID }).to_string(),
        ))
        .await?;

        let mut total = 0_usize;
        while let Some(message) = source.next().await {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            let frame = translate_frame(message?);
            if let Some(audio) = frame.audio {
                total += audio.len();
                if tx.send(audio).await.is_err() {
                    break;
                }
            }
            if frame.is_final {
                break;
            }
        }
        let _ = sink.close().await;
        Ok(total)
    }

    /// Synthesize the whole text in one REST call
    ///
    /// # Errors
    /// Returns [`SpeechError::RateLimited`] on 429, and
    /// [`SpeechError::SynthesisFailed`] for other failure statuses or an
    /// empty audio body.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn synthesize_all(&self, text: &str) -> Result<Bytes, SpeechError> {
        let api_key = self.api_key()?;
        let body = json!({
            "text": text,
            "model_id": self.config.tts_model,
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 },
        });

        let response = self
            .client
            .post(self.rest_url())
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SpeechError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::SynthesisFailed(format!("Status {status}: {body}")));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::SynthesisFailed("empty audio body".to_string()));
        }
        debug!(bytes = audio.len(), "Synthesized audio");
        Ok(audio)
    }
}

/// The audio stream for one spoken reply
///
/// Once [`cancel`](Self::cancel) has been called, [`next_chunk`](Self::next_chunk)
/// returns `None` forever, including for chunks already buffered.
#[derive(Debug)]
pub struct SynthesisHandle {
    chunk_rx: mpsc::Receiver<Bytes>,
    cancelled: Arc<AtomicBool>,
}

impl SynthesisHandle {
    /// Pull the next audio chunk; `None` when done or cancelled
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        match self.chunk_rx.recv().await {
            Some(chunk) if !self.cancelled.load(Ordering::SeqCst) => Some(chunk),
            _ => None,
        }
    }

    /// Stop the synthesis; buffered audio is discarded
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.chunk_rx.close();
    }
}

#[derive(Debug, Default)]
struct FrameOutput {
    audio: Option<Bytes>,
    is_final: bool,
}

#[derive(Debug, Default, Deserialize)]
struct WireFrame {
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    is_final: Option<bool>,
    // Some API variants use camelCase for the final marker.
    #[serde(default, rename = "isFinal")]
    is_final_camel: Option<bool>,
}

fn translate_frame(message: Message) -> FrameOutput {
    match message {
        Message::Text(raw) => {
            let Ok(frame) = serde_json::from_str::<WireFrame>(&raw) else {
                return FrameOutput::default();
            };
            let audio = frame
                .audio
                .and_then(|encoded| BASE64.decode(encoded).ok())
                .filter(|bytes| !bytes.is_empty())
                .map(Bytes::from);
            FrameOutput {
                audio,
                is_final: frame.is_final.unwrap_or(false)
                    || frame.is_final_camel.unwrap_or(false),
            }
        },
        Message::Binary(payload) => {
            if payload.is_empty() {
                FrameOutput::default()
            } else {
                FrameOutput {
                    audio: Some(Bytes::from(payload)),
                    is_final: false,
                }
            }
        },
        Message::Close(_) => FrameOutput {
            audio: None,
            is_final: true,
        },
        _ => FrameOutput::default(),
    }
}
