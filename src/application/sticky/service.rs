//! Sticky service - the entry points used by admin commands and the watcher

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::cooldown;
use super::engine::{CycleOutcome, RepostEngine};
use super::flight::Flights;
use super::registry::StickyRegistry;
use crate::application::errors::StickyError;
use crate::domain::traits::{ChatPlatform, StickyStore};

pub struct StickyService {
    registry: Arc<StickyRegistry>,
    engine: RepostEngine,
    flights: Flights,
}

impl StickyService {
    pub fn new(store: Arc<dyn StickyStore>, platform: Arc<dyn ChatPlatform>) -> Self {
        let registry = Arc::new(StickyRegistry::new(Arc::clone(&store), Arc::clone(&platform)));
        let engine = RepostEngine::new(Arc::clone(&registry), platform, store);
        Self {
            registry,
            engine,
            flights: Flights::new(),
        }
    }

    pub fn with_warning_text(mut self, text: impl Into<String>) -> Self {
        self.engine = self.engine.with_warning_text(text);
        self
    }

    pub fn registry(&self) -> &StickyRegistry {
        &self.registry
    }

    /// Populate the registry from the store. Call once before handling events.
    pub async fn load(&self) -> usize {
        self.registry.load().await
    }

    /// Create or update the sticky for a channel
    pub async fn set_sticky(
        &self,
        guild_id: &str,
        channel_id: &str,
        content: &str,
        cooldown_seconds: i64,
        include_warning: bool,
    ) -> Result<(), StickyError> {
        if guild_id.trim().is_empty() {
            return Err(StickyError::InvalidInput("stickies can only be set in a server".to_string()));
        }
        if channel_id.trim().is_empty() {
            return Err(StickyError::InvalidInput("a target channel is required".to_string()));
        }
        if content.trim().is_empty() {
            return Err(StickyError::InvalidInput("sticky message cannot be empty".to_string()));
        }
        if cooldown_seconds < 0 {
            return Err(StickyError::InvalidInput(format!(
                "cooldown must be zero or more seconds, got {}",
                cooldown_seconds
            )));
        }
        // stored as a signed 64-bit column
        let cooldown_ms = cooldown_seconds
            .checked_mul(1000)
            .and_then(|ms| u64::try_from(ms).ok())
            .ok_or_else(|| StickyError::InvalidInput(format!("cooldown of {}s is too large", cooldown_seconds)))?;

        self.registry
            .upsert(guild_id, channel_id, content, cooldown_ms, include_warning)
            .await?;
        Ok(())
    }

    /// Remove the sticky for a channel. Returns false when the store delete
    /// failed; the sticky stops reposting either way.
    pub async fn remove_sticky(&self, guild_id: &str, channel_id: &str) -> bool {
        self.registry.remove(guild_id, channel_id).await.is_ok()
    }

    /// Handle one qualifying message: check the cooldown and repost if due.
    ///
    /// Never fails from the caller's point of view; every error ends here.
    pub async fn on_message(&self, guild_id: Option<&str>, channel_id: &str, now: DateTime<Utc>) {
        let Some(_flight) = self.flights.begin(channel_id) else {
            tracing::debug!("Repost already in flight for {}, skipping", channel_id);
            return;
        };

        let Some(entry) = self.registry.get(channel_id).await else {
            return;
        };

        if !cooldown::should_fire(&entry, now) {
            return;
        }

        match self.engine.run_cycle(&entry, guild_id, now).await {
            Ok(CycleOutcome::Reposted { .. }) | Ok(CycleOutcome::Withdrawn { .. }) => {}
            Err(e) => {
                tracing::error!("Failed to repost sticky in {}: {}", channel_id, e);
            }
        }
    }
}
