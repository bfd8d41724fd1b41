//! Conversation turn entity
//!
//! A turn is one caller utterance plus the agent's response to it. Every
//! finalized transcript opens a turn; the turn's outcome records how the
//! response ended. Outcomes are write-once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// How a conversation turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The turn is still in progress
    Pending,
    /// The reply was generated and delivered in full
    Completed,
    /// The caller barged in and the reply was cut short
    Interrupted,
    /// The transcript was blank and no reply was attempted
    Skipped,
}

impl TurnOutcome {
    /// Whether the outcome is terminal
    #[must_use]
    pub const fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Human-readable name of the outcome
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Skipped => "skipped",
        }
    }
}

/// One caller utterance and the agent's response to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Monotonic sequence number within the conversation
    pub seq: u64,
    /// Final transcript of the caller's utterance
    pub transcript: String,
    /// The agent's reply text, once generated
    pub reply: Option<String>,
    /// When the turn opened
    pub created_at: DateTime<Utc>,
    outcome: TurnOutcome,
}

impl ConversationTurn {
    /// Open a new turn for a finalized transcript
    pub fn new(seq: u64, transcript: impl Into<String>) -> Self {
        Self {
            seq,
            transcript: transcript.into(),
            reply: None,
            created_at: Utc::now(),
            outcome: TurnOutcome::Pending,
        }
    }

    /// Current outcome of the turn
    #[must_use]
    pub const fn outcome(&self) -> TurnOutcome {
        self.outcome
    }

    /// Record the agent's reply text
    pub fn set_reply(&mut self, reply: impl Into<String>) {
        self.reply = Some(reply.into());
    }

    /// Finish the turn with a terminal outcome
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::TurnAlreadyFinished`] if the turn already has a
    /// terminal outcome. Outcomes are write-once; a late completion racing a
    /// barge-in must not overwrite `Interrupted`.
    pub fn finish(&mut self, outcome: TurnOutcome) -> Result<(), DomainError> {
        if self.outcome.is_final() {
            return Err(DomainError::TurnAlreadyFinished {
                seq: self.seq,
                outcome: self.outcome.as_str().to_string(),
            });
        }
        self.outcome = outcome;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_turn_is_pending() {
        let turn = ConversationTurn::new(1, "hello");
        assert_eq!(turn.outcome(), TurnOutcome::Pending);
        assert!(turn.reply.is_none());
    }

    #[test]
    fn finish_sets_outcome_once() {
        let mut turn = ConversationTurn::new(1, "hello");
        turn.finish(TurnOutcome::Completed).unwrap();
        assert_eq!(turn.outcome(), TurnOutcome::Completed);
    }

    #[test]
    fn finish_rejects_second_outcome() {
        let mut turn = ConversationTurn::new(3, "hello");
        turn.finish(TurnOutcome::Interrupted).unwrap();
        let err = turn.finish(TurnOutcome::Completed).unwrap_err();
        assert_eq!(
            err,
            DomainError::TurnAlreadyFinished {
                seq: 3,
                outcome: "interrupted".to_string(),
            }
        );
        assert_eq!(turn.outcome(), TurnOutcome::Interrupted);
    }

    #[test]
    fn pending_is_not_final() {
        assert!(!TurnOutcome::Pending.is_final());
        assert!(TurnOutcome::Completed.is_final());
        assert!(TurnOutcome::Interrupted.is_final());
        assert!(TurnOutcome::Skipped.is_final());
    }
}
