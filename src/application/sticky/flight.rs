//! Per-channel single-flight guard for repost cycles

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks channels with a repost cycle in progress
#[derive(Default, Clone)]
pub struct Flights {
    active: Arc<Mutex<HashSet<String>>>,
}

impl Flights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the channel. Returns `None` while another cycle holds it.
    pub fn begin(&self, channel_id: &str) -> Option<FlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(channel_id.to_string()) {
            return None;
        }
        Some(FlightGuard {
            active: Arc::clone(&self.active),
            channel_id: channel_id.to_string(),
        })
    }
}

/// Releases the channel when dropped
pub struct FlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
    channel_id: String,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.channel_id);
    }
}
