//! Application layer - Turn-taking orchestration
//!
//! Contains the port definitions the conversation depends on (speech
//! recognition, reply generation, speech synthesis, and the caller-facing
//! channel) and the services that orchestrate them: the turn coordinator with
//! its barge-in cancellation protocol, the audio ingest path, and the
//! per-connection conversation session.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
