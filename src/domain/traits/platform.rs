use async_trait::async_trait;
use crate::application::errors::PlatformError;
use crate::domain::entities::{Attachment, Member, Message, OutgoingMessage};

/// Chat platform transport - abstraction for Discord-like adapters
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Send a message to a channel, returning the new message id
    async fn send_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<String, PlatformError>;

    /// Delete a message by id
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), PlatformError>;

    /// Fetch up to `limit` messages posted after `after`, oldest first.
    /// With no `after`, returns the most recent messages.
    async fn fetch_messages_after(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<Message>, PlatformError>;

    /// List guild members ordered by user id, starting after `after`
    async fn list_members(
        &self,
        guild_id: &str,
        after: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Member>, PlatformError>;

    /// Set a member's guild nickname, recording `reason` in the audit log
    async fn edit_nickname(
        &self,
        guild_id: &str,
        user_id: &str,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub username: String,
}

/// Source of images for scheduled posts
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self) -> Result<Attachment, PlatformError>;
}
