//! Streaming speech-to-text sessions

pub mod deepgram;

pub use deepgram::{DeepgramSession, DeepgramStt};
