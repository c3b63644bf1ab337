use chrono::{DateTime, Utc};

/// Cooldown applied to rows written before the column existed
pub const DEFAULT_COOLDOWN_MS: u64 = 120_000;

/// Persisted sticky configuration, one per (guild, channel)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickyConfig {
    pub guild_id: String,
    pub channel_id: String,
    pub content: String,
    pub cooldown_ms: u64,
    pub include_warning: bool,
    /// The bot's most recent sticky post in this channel. Only the repost
    /// engine writes it; it may point at a message someone else deleted.
    pub last_message_id: Option<String>,
}

impl StickyConfig {
    pub fn new(
        guild_id: impl Into<String>,
        channel_id: impl Into<String>,
        content: impl Into<String>,
        cooldown_ms: u64,
        include_warning: bool,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
            content: content.into(),
            cooldown_ms,
            include_warning,
            last_message_id: None,
        }
    }

    pub fn with_last_message(mut self, message_id: impl Into<String>) -> Self {
        self.last_message_id = Some(message_id.into());
        self
    }
}

/// In-memory registry entry: the persisted config plus process-local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickyEntry {
    pub config: StickyConfig,
    /// Time of the last successful repost. Never persisted, so the first
    /// qualifying message after a restart always reposts.
    pub last_sent_at: Option<DateTime<Utc>>,
    /// Bumped on every config update so a repost started against an older
    /// config cannot mark the new one as sent
    pub revision: u64,
}

impl From<StickyConfig> for StickyEntry {
    fn from(config: StickyConfig) -> Self {
        Self {
            config,
            last_sent_at: None,
            revision: 0,
        }
    }
}
