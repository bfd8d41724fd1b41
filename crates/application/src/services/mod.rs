//! Application services

mod audio_ingest;
mod conversation_session;
mod turn_coordinator;

pub use audio_ingest::AudioIngest;
pub use conversation_session::{ConversationSession, SessionSettings};
pub use turn_coordinator::{ConversationSummary, CoordinatorConfig, TurnCoordinator};
