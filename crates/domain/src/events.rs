//! Conversation event vocabulary
//!
//! Two tagged unions cross the component boundaries:
//!
//! - [`RecognitionEvent`] — produced by the speech-recognition session,
//!   consumed only by the turn coordinator. Provider wire formats are
//!   normalized into these variants at the session boundary; the coordinator
//!   never sees vendor vocabulary.
//! - [`ChannelEvent`] — the small outbound vocabulary delivered to the
//!   caller's client over the conversation channel.
//!
//! Both are ephemeral and never persisted.

use serde::{Deserialize, Serialize};

/// An event emitted by a streaming speech-recognition session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The caller started producing speech (voice activity detected)
    SpeechStarted,
    /// An interim transcript for the utterance in progress
    PartialTranscript {
        /// Interim transcript text
        text: String,
    },
    /// A finalized transcript for a completed utterance
    FinalTranscript {
        /// Final transcript text
        text: String,
        /// Language the provider recognized (e.g. "en")
        language: String,
    },
    /// The caller stopped producing speech
    UtteranceEnded,
    /// The recognition session ended; no further events will follow
    SessionClosed,
}

impl RecognitionEvent {
    /// Create a final transcript event
    pub fn final_transcript(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self::FinalTranscript {
            text: text.into(),
            language: language.into(),
        }
    }

    /// Create a partial transcript event
    pub fn partial(text: impl Into<String>) -> Self {
        Self::PartialTranscript { text: text.into() }
    }
}

/// An outbound protocol event delivered to the caller's client
///
/// Serializes as a JSON object with a snake_case `type` tag, e.g.
/// `{"type":"agent_response","text":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// The caller started speaking
    SpeechStarted,
    /// The caller stopped speaking
    UtteranceEnd,
    /// Interim transcript for UI display
    PartialTranscript {
        /// Interim transcript text
        text: String,
    },
    /// Finalized transcript of the caller's utterance
    FinalTranscript {
        /// Final transcript text
        text: String,
        /// Recognized language code
        language: String,
    },
    /// The agent's textual reply
    AgentResponse {
        /// Reply text
        text: String,
    },
    /// A chunk of synthesized reply audio (base64-encoded)
    AudioChunk {
        /// Base64-encoded audio bytes
        audio: String,
    },
    /// Synthesis was interrupted by the caller (barge-in)
    TtsInterrupted,
    /// A conversation-scoped error the caller should know about
    Error {
        /// Human-readable message
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_transcript_constructor() {
        let event = RecognitionEvent::final_transcript("hello", "en");
        assert_eq!(
            event,
            RecognitionEvent::FinalTranscript {
                text: "hello".to_string(),
                language: "en".to_string(),
            }
        );
    }

    #[test]
    fn partial_constructor() {
        let event = RecognitionEvent::partial("hel");
        assert_eq!(
            event,
            RecognitionEvent::PartialTranscript {
                text: "hel".to_string()
            }
        );
    }

    #[test]
    fn channel_event_tagged_serialization() {
        let event = ChannelEvent::AgentResponse {
            text: "hi there".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"agent_response","text":"hi there"}"#);
    }

    #[test]
    fn channel_event_unit_variant_serialization() {
        let json = serde_json::to_string(&ChannelEvent::TtsInterrupted).unwrap();
        assert_eq!(json, r#"{"type":"tts_interrupted"}"#);
    }

    #[test]
    fn channel_event_roundtrip() {
        let event = ChannelEvent::FinalTranscript {
            text: "hello".to_string(),
            language: "en".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ChannelEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn error_event_carries_message() {
        let event = ChannelEvent::Error {
            message: "speech recognition unavailable".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("unavailable"));
    }
}
