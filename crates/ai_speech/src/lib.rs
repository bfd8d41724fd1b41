//! AI Speech - Streaming speech recognition and synthesis
//!
//! Provider sessions for real-time voice conversations: a Deepgram-style
//! streaming recognition session over WebSocket and an ElevenLabs-style
//! streaming synthesizer with a REST fallback. Both normalize the vendor
//! wire formats at this boundary; callers only see domain events and raw
//! audio bytes.

pub mod config;
pub mod error;
pub mod stt;
pub mod tts;

pub use config::SpeechConfig;
pub use error::SpeechError;
pub use stt::{DeepgramSession, DeepgramStt};
pub use tts::{ElevenLabsSynthesizer, SynthesisHandle};
