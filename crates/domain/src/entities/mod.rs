//! Domain entities

pub mod chat_message;
pub mod conversation;
pub mod conversation_turn;

pub use chat_message::{ChatMessage, MessageRole};
pub use conversation::ConversationHistory;
pub use conversation_turn::{ConversationTurn, TurnOutcome};
