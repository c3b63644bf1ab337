//! Sticky registry - the in-memory view of every channel's sticky
//!
//! The registry is rebuilt from the store once at startup and afterwards
//! mirrors it: a config change is written to the store first and only then
//! applied in memory, so memory never runs ahead of durable state. Removal is
//! the exception, memory is cleared even when the store delete fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{StickyConfig, StickyEntry};
use crate::domain::traits::{ChatPlatform, StickyStore};

pub struct StickyRegistry {
    store: Arc<dyn StickyStore>,
    platform: Arc<dyn ChatPlatform>,
    entries: RwLock<HashMap<String, StickyEntry>>,
    revisions: AtomicU64,
}

impl StickyRegistry {
    pub fn new(store: Arc<dyn StickyStore>, platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            store,
            platform,
            entries: RwLock::new(HashMap::new()),
            revisions: AtomicU64::new(1),
        }
    }

    /// Replace the in-memory map with every row in the store.
    ///
    /// A store failure leaves the registry empty; the sticky feature stays
    /// inert until the next restart or an explicit set.
    pub async fn load(&self) -> usize {
        let rows = match self.store.load_stickies().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to load sticky configs, continuing without them: {}", e);
                Vec::new()
            }
        };

        let mut entries = self.entries.write().await;
        entries.clear();
        for config in rows {
            entries.insert(config.channel_id.clone(), StickyEntry::from(config));
        }

        tracing::info!("Loaded {} sticky configs", entries.len());
        entries.len()
    }

    /// Create or update the sticky for a channel.
    ///
    /// The posted message id survives the update so the next repost still
    /// cleans up the current sticky. `last_sent_at` is reset, so the next
    /// qualifying message reposts with the new content.
    pub async fn upsert(
        &self,
        guild_id: &str,
        channel_id: &str,
        content: &str,
        cooldown_ms: u64,
        include_warning: bool,
    ) -> Result<StickyEntry, StorageError> {
        let existing_message = self
            .get(channel_id)
            .await
            .and_then(|entry| entry.config.last_message_id);

        let mut config = StickyConfig::new(guild_id, channel_id, content, cooldown_ms, include_warning);
        config.last_message_id = existing_message;

        self.store.upsert_sticky(&config).await?;

        let mut entries = self.entries.write().await;
        // a repost may have landed while the store write was in flight
        if let Some(current) = entries.get(channel_id) {
            config.last_message_id = current.config.last_message_id.clone();
        }
        let mut entry = StickyEntry::from(config);
        entry.revision = self.revisions.fetch_add(1, Ordering::Relaxed);
        entries.insert(channel_id.to_string(), entry.clone());

        tracing::info!(
            guild_id = %guild_id,
            channel_id = %channel_id,
            cooldown_ms,
            "Sticky configured"
        );
        Ok(entry)
    }

    /// Remove the sticky for a channel.
    ///
    /// Returns the store outcome; the last posted message is deleted best
    /// effort and the in-memory entry is dropped either way.
    pub async fn remove(&self, guild_id: &str, channel_id: &str) -> Result<(), StorageError> {
        let store_result = self.store.delete_sticky(guild_id, channel_id).await;
        if let Err(e) = &store_result {
            tracing::error!("Failed to delete sticky row for channel {}: {}", channel_id, e);
        }

        let last_message_id = self
            .get(channel_id)
            .await
            .and_then(|entry| entry.config.last_message_id);

        if let Some(message_id) = last_message_id {
            if let Err(e) = self.platform.delete_message(channel_id, &message_id).await {
                tracing::debug!("Could not delete sticky post {} in {}: {}", message_id, channel_id, e);
            }
        }

        self.entries.write().await.remove(channel_id);
        tracing::info!(guild_id = %guild_id, channel_id = %channel_id, "Sticky removed");

        store_result.map(|_| ())
    }

    pub async fn get(&self, channel_id: &str) -> Option<StickyEntry> {
        self.entries.read().await.get(channel_id).cloned()
    }

    /// Record a successful repost of the entry at `revision`. Returns the
    /// updated config, or `None` if the sticky was removed while the post was
    /// in flight.
    ///
    /// The message id is always recorded so the post gets cleaned up. If the
    /// config changed mid-cycle the cooldown is left unstamped and the next
    /// message posts the new content.
    pub async fn record_post(
        &self,
        channel_id: &str,
        revision: u64,
        message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Option<StickyConfig> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(channel_id)?;
        entry.config.last_message_id = Some(message_id.to_string());
        if entry.revision == revision {
            entry.last_sent_at = Some(sent_at);
        }
        Some(entry.config.clone())
    }

    /// (guild_id, channel_id) of every configured sticky
    pub async fn channels(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .await
            .values()
            .map(|e| (e.config.guild_id.clone(), e.config.channel_id.clone()))
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
