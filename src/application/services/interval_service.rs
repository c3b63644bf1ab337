//! Interval posts - send an image to a channel on a fixed schedule

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::application::errors::IntervalError;
use crate::domain::entities::{IntervalPost, OutgoingMessage, PostInterval};
use crate::domain::traits::{ChatPlatform, ImageSource, IntervalStore};

pub const DEFAULT_CAPTION: &str = "Here's a random Minky 🐱";
pub const DEFAULT_MIN_INTERVAL_MINUTES: u64 = 5;

type ChannelKey = (String, String);

/// Sends one captioned image; cloned into every schedule task
#[derive(Clone)]
struct Poster {
    platform: Arc<dyn ChatPlatform>,
    images: Arc<dyn ImageSource>,
    caption: String,
}

impl Poster {
    async fn post(&self, channel_id: &str) {
        let image = match self.images.fetch_image().await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Failed to fetch scheduled image for {}: {}", channel_id, e);
                return;
            }
        };

        let message = OutgoingMessage::new(self.caption.clone()).with_attachment(image);
        if let Err(e) = self.platform.send_message(channel_id, &message).await {
            tracing::error!("Failed to send scheduled image to {}: {}", channel_id, e);
        }
    }
}

struct Scheduled {
    post: IntervalPost,
    task: JoinHandle<()>,
}

pub struct IntervalService {
    store: Arc<dyn IntervalStore>,
    poster: Poster,
    min_interval_minutes: u64,
    schedules: Mutex<HashMap<ChannelKey, Scheduled>>,
}

impl IntervalService {
    pub fn new(
        store: Arc<dyn IntervalStore>,
        platform: Arc<dyn ChatPlatform>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            store,
            poster: Poster {
                platform,
                images,
                caption: DEFAULT_CAPTION.to_string(),
            },
            min_interval_minutes: DEFAULT_MIN_INTERVAL_MINUTES,
            schedules: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.poster.caption = caption.into();
        self
    }

    pub fn with_min_interval_minutes(mut self, minutes: u64) -> Self {
        self.min_interval_minutes = minutes;
        self
    }

    /// Resume every stored schedule. The first post of each waits one full
    /// period; a load failure leaves nothing scheduled.
    pub async fn load(&self) -> usize {
        let rows = match self.store.load_intervals().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to load interval posts: {}", e);
                return 0;
            }
        };

        let mut schedules = self.schedules.lock().await;
        for post in rows {
            let period = Duration::from_millis(post.interval_ms.max(1));
            let task = spawn_schedule(self.poster.clone(), post.channel_id.clone(), period, Instant::now() + period);
            let key = (post.guild_id.clone(), post.channel_id.clone());
            if let Some(old) = schedules.insert(key, Scheduled { post, task }) {
                old.task.abort();
            }
        }

        tracing::info!("Loaded {} interval posts", schedules.len());
        schedules.len()
    }

    /// Schedule (or reschedule) image posts for a channel and send the first
    /// one right away
    pub async fn start(&self, guild_id: &str, channel_id: &str, interval: &str) -> Result<PostInterval, IntervalError> {
        let parsed = PostInterval::parse(interval).ok_or(IntervalError::InvalidFormat)?;
        let interval_ms = parsed
            .as_millis()
            .filter(|ms| *ms > 0)
            .ok_or(IntervalError::InvalidFormat)?;
        if interval_ms < self.min_interval_minutes.saturating_mul(60 * 1000) {
            return Err(IntervalError::TooShort(self.min_interval_minutes));
        }

        let post = IntervalPost {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
            interval: parsed.spec(),
            interval_ms,
        };
        self.store.save_interval(&post).await?;

        let period = Duration::from_millis(interval_ms);
        {
            let mut schedules = self.schedules.lock().await;
            let task = spawn_schedule(self.poster.clone(), channel_id.to_string(), period, Instant::now() + period);
            let key = (guild_id.to_string(), channel_id.to_string());
            if let Some(old) = schedules.insert(key, Scheduled { post, task }) {
                old.task.abort();
            }
        }

        tracing::info!(guild_id = %guild_id, channel_id = %channel_id, interval = %parsed, "Interval post scheduled");
        self.poster.post(channel_id).await;
        Ok(parsed)
    }

    /// Stop a channel's schedule. The timer stops even if the store delete
    /// fails.
    pub async fn stop(&self, guild_id: &str, channel_id: &str) -> Result<IntervalPost, IntervalError> {
        let key = (guild_id.to_string(), channel_id.to_string());
        let scheduled = self
            .schedules
            .lock()
            .await
            .remove(&key)
            .ok_or_else(|| IntervalError::NotScheduled(channel_id.to_string()))?;
        scheduled.task.abort();

        if let Err(e) = self.store.delete_interval(guild_id, channel_id).await {
            tracing::error!("Failed to delete interval post for {}: {}", channel_id, e);
        }

        tracing::info!(guild_id = %guild_id, channel_id = %channel_id, "Interval post stopped");
        Ok(scheduled.post)
    }

    /// Active schedules, in no particular order
    pub async fn active(&self) -> Vec<IntervalPost> {
        self.schedules
            .lock()
            .await
            .values()
            .map(|s| s.post.clone())
            .collect()
    }
}

impl Drop for IntervalService {
    fn drop(&mut self) {
        for scheduled in self.schedules.get_mut().values() {
            scheduled.task.abort();
        }
    }
}

fn spawn_schedule(poster: Poster, channel_id: String, period: Duration, first: Instant) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            poster.post(&channel_id).await;
        }
    })
}
