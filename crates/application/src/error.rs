//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// No speech-recognition backend could be reached
    #[error("Speech recognition is unavailable")]
    RecognitionUnavailable,

    /// Reply generation failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// Speech synthesis failed
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// The caller-facing transport is gone
    #[error("Transport closed")]
    TransportClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Whether the conversation can continue after this error
    ///
    /// A closed transport ends the conversation; everything else degrades a
    /// single turn or a single modality.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::TransportClosed)
    }
}
