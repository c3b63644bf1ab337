use super::User;
use chrono::{DateTime, Utc};

/// Whether an outgoing message may ping users, roles or `@everyone`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionPolicy {
    /// No mention in the content notifies anyone
    Suppress,
    /// Platform default parsing
    Default,
}

/// Represents an incoming chat message
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    /// Absent for direct messages
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub author: User,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(channel_id: impl Into<String>, author: User, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            guild_id: None,
            channel_id: channel_id.into(),
            author,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A message the bot is about to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    pub mentions: MentionPolicy,
    /// Message being replied to, if any
    pub reply_to: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// A file uploaded along with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

impl OutgoingMessage {
    /// Plain text with the platform's default mention handling
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mentions: MentionPolicy::Default,
            reply_to: None,
            attachments: Vec::new(),
        }
    }

    /// Plain text with every mention suppressed
    pub fn silent(content: impl Into<String>) -> Self {
        Self {
            mentions: MentionPolicy::Suppress,
            ..Self::new(content)
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }
}
