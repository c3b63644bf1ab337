//! In-memory storage implementation
//!
//! Used for the console dev mode (`run --memory`) and as the store behind
//! unit tests. Nothing survives a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{Autoresponder, IntervalPost, StickyConfig};
use crate::domain::traits::{AutoresponderStore, IntervalStore, StickyStore};

type StickyKey = (String, String);

/// HashMap-backed store
#[derive(Default, Clone)]
pub struct MemoryStore {
    stickies: Arc<RwLock<HashMap<StickyKey, StickyConfig>>>,
    responders: Arc<RwLock<Vec<Autoresponder>>>,
    intervals: Arc<RwLock<HashMap<StickyKey, IntervalPost>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sticky rows
    #[cfg(test)]
    pub async fn sticky_rows(&self) -> usize {
        self.stickies.read().await.len()
    }

    #[cfg(test)]
    pub async fn sticky(&self, guild_id: &str, channel_id: &str) -> Option<StickyConfig> {
        self.stickies
            .read()
            .await
            .get(&(guild_id.to_string(), channel_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl StickyStore for MemoryStore {
    async fn load_stickies(&self) -> Result<Vec<StickyConfig>, StorageError> {
        let stickies = self.stickies.read().await;
        Ok(stickies.values().cloned().collect())
    }

    async fn upsert_sticky(&self, config: &StickyConfig) -> Result<(), StorageError> {
        let mut stickies = self.stickies.write().await;
        let key = (config.guild_id.clone(), config.channel_id.clone());
        match stickies.get_mut(&key) {
            Some(row) => {
                row.content = config.content.clone();
                row.cooldown_ms = config.cooldown_ms;
                row.include_warning = config.include_warning;
            }
            None => {
                stickies.insert(key, config.clone());
            }
        }
        Ok(())
    }

    async fn delete_sticky(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError> {
        let mut stickies = self.stickies.write().await;
        Ok(stickies
            .remove(&(guild_id.to_string(), channel_id.to_string()))
            .is_some())
    }

    async fn set_last_message_id(
        &self,
        guild_id: Option<&str>,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), StorageError> {
        let mut stickies = self.stickies.write().await;
        for ((row_guild, row_channel), row) in stickies.iter_mut() {
            let guild_ok = guild_id.map_or(true, |g| g == row_guild);
            if guild_ok && row_channel == channel_id {
                row.last_message_id = Some(message_id.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AutoresponderStore for MemoryStore {
    async fn load_autoresponders(&self) -> Result<Vec<Autoresponder>, StorageError> {
        Ok(self.responders.read().await.clone())
    }

    async fn save_autoresponder(&self, responder: &Autoresponder) -> Result<(), StorageError> {
        let mut responders = self.responders.write().await;
        match responders.iter_mut().find(|r| {
            r.guild_id == responder.guild_id
                && r.trigger == responder.trigger
                && r.channel_id == responder.channel_id
        }) {
            Some(existing) => existing.response = responder.response.clone(),
            None => responders.push(responder.clone()),
        }
        Ok(())
    }

    async fn delete_autoresponder(
        &self,
        guild_id: &str,
        trigger: &str,
        channel_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut responders = self.responders.write().await;
        responders.retain(|r| {
            !(r.guild_id == guild_id && r.trigger == trigger && r.channel_id.as_deref() == channel_id)
        });
        Ok(())
    }
}

#[async_trait]
impl IntervalStore for MemoryStore {
    async fn load_intervals(&self) -> Result<Vec<IntervalPost>, StorageError> {
        Ok(self.intervals.read().await.values().cloned().collect())
    }

    async fn save_interval(&self, post: &IntervalPost) -> Result<(), StorageError> {
        self.intervals
            .write()
            .await
            .insert((post.guild_id.clone(), post.channel_id.clone()), post.clone());
        Ok(())
    }

    async fn delete_interval(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError> {
        Ok(self
            .intervals
            .write()
            .await
            .remove(&(guild_id.to_string(), channel_id.to_string()))
            .is_some())
    }
}
