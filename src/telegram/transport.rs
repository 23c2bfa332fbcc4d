//! The chat operations the bot's core depends on.

use async_trait::async_trait;

use super::{TelegramError, User};

/// Outgoing side of the chat platform.
///
/// Every call may fail with a [`TelegramError`]; callers log it and carry on
/// with their next item.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a text message, returning the id of the sent message.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TelegramError>;

    /// Forwards `message_id` from `from_chat_id` into `chat_id`.
    async fn forward_message(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<(), TelegramError>;

    /// Lists the administrators of a chat.
    async fn chat_administrators(&self, chat_id: i64) -> Result<Vec<User>, TelegramError>;

    /// Removes a user from a chat. The user may be invited back later.
    async fn remove_member(&self, chat_id: i64, user_id: i64) -> Result<(), TelegramError>;
}
