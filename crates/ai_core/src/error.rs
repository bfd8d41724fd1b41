//! Generation errors

use thiserror::Error;

/// Errors that can occur during reply generation
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Failed to connect to the generation backend
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to the backend failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout waiting for the completion
    #[error("Generation timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// API key rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend returned a server error
    #[error("Server error: {0}")]
    ServerError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for GenerationError {
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
