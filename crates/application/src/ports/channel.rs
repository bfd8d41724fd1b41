//! Conversation channel port - Outbound events to the caller's client

use async_trait::async_trait;
use domain::ChannelEvent;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for delivering protocol events to the caller
///
/// Implementations must preserve send order per conversation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConversationChannel: Send + Sync {
    /// Send one event to the caller
    ///
    /// # Errors
    /// Returns [`ApplicationError::TransportClosed`] when the caller has
    /// disconnected.
    async fn send(&self, event: ChannelEvent) -> Result<(), ApplicationError>;
}
