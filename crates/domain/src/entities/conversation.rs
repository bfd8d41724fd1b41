//! Conversation history entity

use crate::entities::chat_message::ChatMessage;
use crate::value_objects::ConversationId;

/// Append-only record of the messages exchanged in a conversation
///
/// Messages are appended in pairs (caller, agent) only after a reply has
/// been accepted, so readers never observe a half-written turn. Replies
/// cancelled before generation completes are never appended.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    id: ConversationId,
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    /// Create an empty history for a conversation
    #[must_use]
    pub const fn new(id: ConversationId) -> Self {
        Self {
            id,
            messages: Vec::new(),
        }
    }

    /// Identifier of the conversation this history belongs to
    #[must_use]
    pub const fn id(&self) -> ConversationId {
        self.id
    }

    /// Append a single message
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append a completed exchange: the caller's utterance and the agent's reply
    pub fn push_exchange(&mut self, user_text: impl Into<String>, reply_text: impl Into<String>) {
        self.messages.push(ChatMessage::user(user_text));
        self.messages.push(ChatMessage::assistant(reply_text));
    }

    /// All messages in order
    #[must_use]
    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no messages have been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::chat_message::MessageRole;

    #[test]
    fn new_history_is_empty() {
        let history = ConversationHistory::new(ConversationId::new());
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn push_exchange_appends_pair_in_order() {
        let mut history = ConversationHistory::new(ConversationId::new());
        history.push_exchange("hello", "hi there");
        assert_eq!(history.len(), 2);
        assert_eq!(history.as_slice()[0].role, MessageRole::User);
        assert_eq!(history.as_slice()[0].content, "hello");
        assert_eq!(history.as_slice()[1].role, MessageRole::Assistant);
        assert_eq!(history.as_slice()[1].content, "hi there");
    }

    #[test]
    fn push_single_message() {
        let mut history = ConversationHistory::new(ConversationId::new());
        history.push(ChatMessage::user("just me"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.as_slice()[0].role, MessageRole::User);
    }
}
