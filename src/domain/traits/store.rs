use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::{Autoresponder, IntervalPost, StickyConfig};

/// Durable sticky configuration, keyed by (guild_id, channel_id)
#[async_trait]
pub trait StickyStore: Send + Sync {
    /// Full scan of every configured sticky
    async fn load_stickies(&self) -> Result<Vec<StickyConfig>, StorageError>;

    /// Insert or update by key. An existing row keeps its stored
    /// `last_message_id`; a new row takes the one in `config`.
    async fn upsert_sticky(&self, config: &StickyConfig) -> Result<(), StorageError>;

    /// Delete by key, returning whether a row existed
    async fn delete_sticky(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError>;

    /// Record the latest sticky post. Without a guild id every row for the
    /// channel is updated.
    async fn set_last_message_id(
        &self,
        guild_id: Option<&str>,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), StorageError>;
}

/// Durable autoresponders, keyed by (guild_id, trigger, channel_id)
#[async_trait]
pub trait AutoresponderStore: Send + Sync {
    async fn load_autoresponders(&self) -> Result<Vec<Autoresponder>, StorageError>;
    async fn save_autoresponder(&self, responder: &Autoresponder) -> Result<(), StorageError>;
    async fn delete_autoresponder(
        &self,
        guild_id: &str,
        trigger: &str,
        channel_id: Option<&str>,
    ) -> Result<(), StorageError>;
}

/// Durable interval posts, keyed by (guild_id, channel_id)
#[async_trait]
pub trait IntervalStore: Send + Sync {
    async fn load_intervals(&self) -> Result<Vec<IntervalPost>, StorageError>;

    /// Insert or replace the schedule for the post's channel
    async fn save_interval(&self, post: &IntervalPost) -> Result<(), StorageError>;

    /// Delete by key, returning whether a row existed
    async fn delete_interval(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError>;
}
