//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::application::errors::PlatformError;
use crate::domain::entities::{Member, Message, OutgoingMessage, User};
use crate::domain::traits::{BotInfo, ChatPlatform};

/// Guild every console message is posted in
pub const CONSOLE_GUILD: &str = "console-guild";
/// Channel every console message is posted in
pub const CONSOLE_CHANNEL: &str = "console";

/// Console adapter for local development. Lines typed on stdin become guild
/// messages from a single local user; everything the bot sends is printed.
pub struct ConsoleAdapter {
    info: BotInfo,
    user: User,
    stdin: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console-bot".to_string(),
                username: "stickybot".to_string(),
            },
            user: User::new("console-user").with_username("you"),
            stdin: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Read the next line as a message, `None` on end of input
    pub async fn next_message(&self) -> Option<Message> {
        let line = match self.stdin.lock().await.next_line().await {
            Ok(line) => line?,
            Err(e) => {
                tracing::error!("Failed to read stdin: {}", e);
                return None;
            }
        };
        Some(Message::new(CONSOLE_CHANNEL, self.user.clone(), line.trim()).in_guild(CONSOLE_GUILD))
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPlatform for ConsoleAdapter {
    async fn send_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<String, PlatformError> {
        let id = uuid::Uuid::new_v4().to_string();
        println!("[BOT #{} {}] {}", channel_id, id, message.content);
        for attachment in &message.attachments {
            println!("[BOT #{} {}] (attached {}, {} bytes)", channel_id, id, attachment.filename, attachment.data.len());
        }
        Ok(id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), PlatformError> {
        println!("[BOT #{}] (deleted {})", channel_id, message_id);
        Ok(())
    }

    async fn fetch_messages_after(
        &self,
        _channel_id: &str,
        _after: Option<&str>,
        _limit: u8,
    ) -> Result<Vec<Message>, PlatformError> {
        // Input arrives through next_message
        Ok(Vec::new())
    }

    async fn list_members(
        &self,
        _guild_id: &str,
        _after: Option<&str>,
        _limit: u16,
    ) -> Result<Vec<Member>, PlatformError> {
        // The console has no member list
        Ok(Vec::new())
    }

    async fn edit_nickname(
        &self,
        guild_id: &str,
        user_id: &str,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        println!("[BOT {}] (renamed {} to \"{}\": {})", guild_id, user_id, nickname, reason);
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
