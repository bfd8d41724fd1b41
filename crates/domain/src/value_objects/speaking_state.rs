//! Caller speaking state value object

use serde::{Deserialize, Serialize};

/// Whether the caller is currently producing speech
///
/// Derived from recognition events: `SpeechStarted` moves to
/// `CallerSpeaking`, a finalized transcript or utterance end moves back to
/// `Listening`. Replies may only begin while `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakingState {
    /// No caller speech in progress
    #[default]
    Listening,
    /// The caller is speaking; agent output is suppressed
    CallerSpeaking,
}

impl SpeakingState {
    /// Whether the caller is speaking right now
    #[must_use]
    pub const fn is_caller_speaking(&self) -> bool {
        matches!(self, Self::CallerSpeaking)
    }
}
