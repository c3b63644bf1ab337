use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::application::errors::{BotError, CommandError};
use crate::application::messaging::CommandParser;
use crate::application::sticky::StickyService;
use crate::domain::entities::{Message, OutgoingMessage};
use crate::domain::traits::ChatPlatform;
use super::{AutoresponderService, CommandService};

/// Message watcher - runs every inbound message through stickies, admin
/// commands and autoresponders
pub struct MessageService {
    platform: Arc<dyn ChatPlatform>,
    stickies: Arc<StickyService>,
    commands: CommandService,
    responders: Arc<AutoresponderService>,
    parser: CommandParser,
}

impl MessageService {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        stickies: Arc<StickyService>,
        commands: CommandService,
        responders: Arc<AutoresponderService>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            stickies,
            commands,
            responders,
            parser: CommandParser::new(prefix),
        }
    }

    /// Whether a message is eligible for any handling at all
    pub fn qualifies(&self, message: &Message) -> bool {
        !message.author.is_bot
            && message.author.id != self.platform.bot_info().id
            && message.guild_id.is_some()
    }

    /// Handle one inbound message. The sticky check runs on its own task so a
    /// slow repost never holds up command handling; the handle is returned for
    /// callers that want to wait for it.
    pub async fn handle(&self, message: Message) -> Option<JoinHandle<()>> {
        if !self.qualifies(&message) {
            return None;
        }

        let sticky_task = self.spawn_sticky(&message);

        if let Err(e) = self.process(&message).await {
            tracing::error!("Failed to handle message {} in {}: {}", message.id, message.channel_id, e);
        }

        Some(sticky_task)
    }

    /// Run the sticky pipeline for this message on a separate task
    pub fn spawn_sticky(&self, message: &Message) -> JoinHandle<()> {
        let stickies = Arc::clone(&self.stickies);
        let guild_id = message.guild_id.clone();
        let channel_id = message.channel_id.clone();
        let timestamp = message.timestamp;

        tokio::spawn(async move {
            stickies.on_message(guild_id.as_deref(), &channel_id, timestamp).await;
        })
    }

    /// Admin commands first, then autoresponders. Returns the reply sent, if any.
    pub async fn process(&self, message: &Message) -> Result<Option<String>, BotError> {
        let Some(guild_id) = message.guild_id.as_deref() else {
            return Ok(None);
        };

        if let Some(cmd) = self.parser.parse(&message.content) {
            if self.commands.handles(&cmd.name) {
                let reply = match self.commands.handle(message, &cmd).await {
                    Ok(reply) => reply,
                    Err(CommandError::PermissionDenied) => {
                        "❌ You need moderator permissions to use this command.".to_string()
                    }
                    Err(CommandError::Usage(usage)) => usage,
                    Err(e) => return Err(e.into()),
                };
                self.reply(message, &reply).await?;
                return Ok(Some(reply));
            }
        }

        if let Some(response) = self
            .responders
            .find_response(guild_id, &message.channel_id, &message.content)
            .await
        {
            self.reply(message, &response).await?;
            return Ok(Some(response));
        }

        Ok(None)
    }

    async fn reply(&self, message: &Message, text: &str) -> Result<String, BotError> {
        let outgoing = OutgoingMessage::silent(text).replying_to(message.id.clone());
        Ok(self.platform.send_message(&message.channel_id, &outgoing).await?)
    }
}
