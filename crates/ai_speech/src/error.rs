//! Speech processing errors

use thiserror::Error;

/// Errors that can occur during streaming speech processing
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Failed to connect to a speech service
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to a speech service failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Invalid response from a service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Timeout during processing
    #[error("Speech processing timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No backend candidate could be reached
    #[error("Speech service unavailable: {0}")]
    Unavailable(String),

    /// The session has already been closed
    #[error("Session closed")]
    SessionClosed,
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(30_000)
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SpeechError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::ConnectionFailed(err.to_string())
    }
}
