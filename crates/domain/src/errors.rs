//! Domain errors

use thiserror::Error;

/// Errors raised by domain invariants
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A turn outcome was already set and cannot change
    #[error("Turn {seq} already finished with outcome {outcome}")]
    TurnAlreadyFinished {
        /// Sequence number of the turn
        seq: u64,
        /// The outcome it was finished with
        outcome: String,
    },

    /// An operation required a transcript but none was present
    #[error("Empty transcript")]
    EmptyTranscript,
}
