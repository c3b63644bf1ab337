//! Repost engine - delete the previous sticky, send a fresh one, persist its id
//!
//! Each external call is isolated: a failed delete never blocks the new post,
//! a failed send leaves the registry untouched so the next qualifying message
//! retries, and a failed store write only costs a stale id on disk until the
//! next successful cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::registry::StickyRegistry;
use crate::application::errors::PlatformError;
use crate::domain::entities::{OutgoingMessage, StickyEntry};
use crate::domain::traits::{ChatPlatform, StickyStore};

/// Header placed above stickies configured with a warning
pub const DEFAULT_WARNING_TEXT: &str = "**__Stickied message:__**";

/// What a completed cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New sticky posted; `persisted` is false when the store write failed
    Reposted { message_id: String, persisted: bool },
    /// The sticky was removed mid-cycle and the fresh post was withdrawn
    Withdrawn { message_id: String },
}

pub struct RepostEngine {
    registry: Arc<StickyRegistry>,
    platform: Arc<dyn ChatPlatform>,
    store: Arc<dyn StickyStore>,
    warning_text: String,
}

impl RepostEngine {
    pub fn new(
        registry: Arc<StickyRegistry>,
        platform: Arc<dyn ChatPlatform>,
        store: Arc<dyn StickyStore>,
    ) -> Self {
        Self {
            registry,
            platform,
            store,
            warning_text: DEFAULT_WARNING_TEXT.to_string(),
        }
    }

    pub fn with_warning_text(mut self, text: impl Into<String>) -> Self {
        self.warning_text = text.into();
        self
    }

    /// Body actually posted for a sticky
    pub fn compose(&self, content: &str, include_warning: bool) -> String {
        if include_warning {
            format!("{}\n{}", self.warning_text, content)
        } else {
            content.to_string()
        }
    }

    /// Run one repost cycle for `entry`.
    ///
    /// The only error is a failed send, in which case nothing changed.
    /// `fallback_guild` keys the persisted id when the config has no guild.
    pub async fn run_cycle(
        &self,
        entry: &StickyEntry,
        fallback_guild: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome, PlatformError> {
        let config = &entry.config;
        let channel_id = config.channel_id.as_str();

        if let Some(previous) = &config.last_message_id {
            self.delete_previous(channel_id, previous).await;
        }

        let outgoing = OutgoingMessage::silent(self.compose(&config.content, config.include_warning));
        let message_id = self.platform.send_message(channel_id, &outgoing).await?;

        let Some(updated) = self.registry.record_post(channel_id, entry.revision, &message_id, now).await else {
            tracing::info!("Sticky in {} was removed during repost, withdrawing {}", channel_id, message_id);
            self.delete_previous(channel_id, &message_id).await;
            return Ok(CycleOutcome::Withdrawn { message_id });
        };

        let guild_id = Some(updated.guild_id.as_str())
            .filter(|g| !g.is_empty())
            .or(fallback_guild.filter(|g| !g.is_empty()));

        let persisted = match self.store.set_last_message_id(guild_id, channel_id, &message_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist sticky message id for {}: {}", channel_id, e);
                false
            }
        };

        tracing::debug!(channel_id = %channel_id, message_id = %message_id, "Sticky reposted");
        Ok(CycleOutcome::Reposted { message_id, persisted })
    }

    /// Best-effort delete; only unexpected failures are worth a warning
    async fn delete_previous(&self, channel_id: &str, message_id: &str) {
        match self.platform.delete_message(channel_id, message_id).await {
            Ok(()) => {}
            Err(e) if e.is_expected_on_delete() => {
                tracing::debug!("Previous sticky {} in {} already gone: {}", message_id, channel_id, e);
            }
            Err(e) => {
                tracing::warn!("Failed to delete previous sticky {} in {}: {}", message_id, channel_id, e);
            }
        }
    }
}
