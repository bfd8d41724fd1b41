//! Streaming text-to-speech

pub mod elevenlabs;

pub use elevenlabs::{ElevenLabsSynthesizer, SynthesisHandle};
