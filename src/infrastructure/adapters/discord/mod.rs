//! Discord adapter over the REST API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::errors::{BotError, ConfigError, PlatformError};
use crate::domain::entities::{MentionPolicy, Member, Message, OutgoingMessage, User};
use crate::domain::traits::{BotInfo, ChatPlatform};
use crate::infrastructure::config::DiscordConfig;

/// Discord message as returned by the channel messages endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: ApiUser,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Guild member as returned by the list members endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMember {
    pub user: ApiUser,
    #[serde(default)]
    pub nick: Option<String>,
}

impl ApiUser {
    fn into_user(self) -> User {
        let mut user = User::new(self.id).with_username(self.username);
        if let Some(name) = self.global_name {
            user = user.with_display_name(name);
        }
        if self.bot {
            user = user.bot();
        }
        user
    }
}

impl ApiMember {
    pub fn into_member(self, guild_id: &str) -> Member {
        let member = Member::new(guild_id, self.user.into_user());
        match self.nick {
            Some(nick) => member.with_nickname(nick),
            None => member,
        }
    }
}

impl ApiMessage {
    pub fn into_message(self) -> Message {
        let author = self.author.into_user();

        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let mut message = Message::new(self.channel_id, author, self.content)
            .with_id(self.id)
            .at(timestamp);
        if let Some(guild_id) = self.guild_id {
            message = message.in_guild(guild_id);
        }
        message
    }
}

#[derive(Serialize)]
struct AllowedMentions {
    parse: Vec<String>,
}

#[derive(Serialize)]
struct MessageReference {
    message_id: String,
    fail_if_not_exists: bool,
}

#[derive(Serialize)]
struct AttachmentRef {
    id: usize,
    filename: String,
}

#[derive(Serialize)]
struct CreateMessageRequest {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_mentions: Option<AllowedMentions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_reference: Option<MessageReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentRef>,
}

impl CreateMessageRequest {
    fn from_outgoing(message: &OutgoingMessage) -> Self {
        Self {
            content: message.content.clone(),
            allowed_mentions: match message.mentions {
                MentionPolicy::Suppress => Some(AllowedMentions { parse: Vec::new() }),
                MentionPolicy::Default => None,
            },
            message_reference: message.reply_to.as_ref().map(|id| MessageReference {
                message_id: id.clone(),
                fail_if_not_exists: false,
            }),
            attachments: message
                .attachments
                .iter()
                .enumerate()
                .map(|(id, a)| AttachmentRef {
                    id,
                    filename: a.filename.clone(),
                })
                .collect(),
        }
    }

    /// Multipart body carrying the JSON payload and each file as `files[n]`
    fn into_form(self, message: &OutgoingMessage) -> Result<Form, PlatformError> {
        let payload = serde_json::to_string(&self)
            .map_err(|e| PlatformError::Api { status: 0, message: format!("invalid payload: {}", e) })?;
        let mut form = Form::new().text("payload_json", payload);
        for (i, attachment) in message.attachments.iter().enumerate() {
            let part = Part::bytes(attachment.data.clone()).file_name(attachment.filename.clone());
            form = form.part(format!("files[{}]", i), part);
        }
        Ok(form)
    }
}

/// Map a non-success status and its body onto a platform error
pub fn classify_status(status: StatusCode, body: &str) -> PlatformError {
    #[derive(Deserialize)]
    struct ApiError {
        #[serde(default)]
        message: String,
        #[serde(default)]
        retry_after: Option<f64>,
    }

    let parsed: Option<ApiError> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::NOT_FOUND => PlatformError::NotFound(message),
        StatusCode::FORBIDDEN => PlatformError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => {
            let seconds = parsed.and_then(|e| e.retry_after).unwrap_or(1.0);
            PlatformError::RateLimited {
                retry_after_ms: (seconds.max(0.0) * 1000.0).ceil() as u64,
            }
        }
        other => PlatformError::Api {
            status: other.as_u16(),
            message,
        },
    }
}

/// Discord bot adapter
pub struct DiscordAdapter {
    token: String,
    api_base: String,
    client: Client,
    info: BotInfo,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig) -> Result<Self, BotError> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingField("discord.token".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| BotError::Network(e.to_string()))?;

        Ok(Self {
            token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
            info: BotInfo {
                id: "unknown".to_string(),
                username: "stickybot".to_string(),
            },
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Fetch the bot's own user so its messages can be ignored
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        let response = self
            .client
            .get(self.url("/users/@me"))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;
        let response = Self::check(response).await?;

        let me: ApiUser = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        self.info = BotInfo {
            id: me.id,
            username: me.username,
        };
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

fn network(e: reqwest::Error) -> PlatformError {
    PlatformError::Network(e.to_string())
}

#[async_trait]
impl ChatPlatform for DiscordAdapter {
    async fn send_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<String, PlatformError> {
        #[derive(Deserialize)]
        struct Created {
            id: String,
        }

        tracing::debug!("Sending to {}: {}", channel_id, message.content);

        let request = CreateMessageRequest::from_outgoing(message);
        let builder = self
            .client
            .post(self.url(&format!("/channels/{}/messages", channel_id)))
            .header("Authorization", self.auth());
        let builder = if message.attachments.is_empty() {
            builder.json(&request)
        } else {
            builder.multipart(request.into_form(message)?)
        };
        let response = builder.send().await.map_err(network)?;
        let response = Self::check(response).await?;

        let created: Created = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(format!("invalid response: {}", e)))?;
        Ok(created.id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), PlatformError> {
        let response = self
            .client
            .delete(self.url(&format!("/channels/{}/messages/{}", channel_id, message_id)))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(network)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_messages_after(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<Message>, PlatformError> {
        let limit = limit.clamp(1, 100).to_string();
        let mut query = vec![("limit", limit)];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .client
            .get(self.url(&format!("/channels/{}/messages", channel_id)))
            .header("Authorization", self.auth())
            .query(&query)
            .send()
            .await
            .map_err(network)?;
        let response = Self::check(response).await?;

        let messages: Vec<ApiMessage> = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(format!("invalid response: {}", e)))?;

        // Discord returns newest first
        Ok(messages.into_iter().rev().map(ApiMessage::into_message).collect())
    }

    async fn list_members(
        &self,
        guild_id: &str,
        after: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Member>, PlatformError> {
        let mut query = vec![("limit", limit.clamp(1, 1000).to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .client
            .get(self.url(&format!("/guilds/{}/members", guild_id)))
            .header("Authorization", self.auth())
            .query(&query)
            .send()
            .await
            .map_err(network)?;
        let response = Self::check(response).await?;

        let members: Vec<ApiMember> = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(format!("invalid response: {}", e)))?;
        Ok(members.into_iter().map(|m| m.into_member(guild_id)).collect())
    }

    async fn edit_nickname(
        &self,
        guild_id: &str,
        user_id: &str,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let response = self
            .client
            .patch(self.url(&format!("/guilds/{}/members/{}", guild_id, user_id)))
            .header("Authorization", self.auth())
            .header("X-Audit-Log-Reason", reason)
            .json(&serde_json::json!({ "nick": nickname }))
            .send()
            .await
            .map_err(network)?;
        Self::check(response).await?;
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
