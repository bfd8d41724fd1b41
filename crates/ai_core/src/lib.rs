//! AI Core - Reply generation for voice conversations
//!
//! Provides the generation abstraction and an OpenAI-compatible
//! chat-completions client. Generation requests are short-form: the
//! conversation history plus the caller's latest utterance, answered in a
//! bounded number of tokens suitable for speech.

pub mod config;
pub mod error;
pub mod openai;
pub mod ports;

pub use config::GenerationConfig;
pub use error::GenerationError;
pub use openai::OpenAiGenerator;
pub use ports::{GenerationEngine, GenerationMessage, GenerationRequest, GenerationResponse};
