//! Per-channel polling cursors over `fetch_messages_after`

use std::collections::HashMap;

use crate::application::errors::PlatformError;
use crate::domain::entities::Message;
use crate::domain::traits::ChatPlatform;

/// Tracks the newest message id seen in each channel so every poll only
/// returns what arrived since the last one
pub struct ChannelPoller {
    cursors: HashMap<String, String>,
    batch: u8,
}

impl ChannelPoller {
    pub fn new(batch: u8) -> Self {
        Self {
            cursors: HashMap::new(),
            batch,
        }
    }

    /// Fetch new messages in a channel, oldest first. The first poll of a
    /// channel only marks the starting point and returns nothing, so history
    /// is never replayed. On error the cursor is left untouched.
    pub async fn poll(&mut self, platform: &dyn ChatPlatform, channel_id: &str) -> Result<Vec<Message>, PlatformError> {
        let after = self.cursors.get(channel_id).cloned();
        let first_poll = after.is_none();
        let limit = if first_poll { 1 } else { self.batch };

        let messages = platform.fetch_messages_after(channel_id, after.as_deref(), limit).await?;

        match messages.last() {
            Some(last) => {
                self.cursors.insert(channel_id.to_string(), last.id.clone());
            }
            // Empty channel: everything after snowflake 0 is new
            None if first_poll => {
                self.cursors.insert(channel_id.to_string(), "0".to_string());
            }
            None => {}
        }

        if first_poll {
            return Ok(Vec::new());
        }
        Ok(messages)
    }
}
