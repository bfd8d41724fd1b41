//! Domain value objects

pub mod conversation_id;
pub mod speaking_state;

pub use conversation_id::ConversationId;
pub use speaking_state::SpeakingState;
