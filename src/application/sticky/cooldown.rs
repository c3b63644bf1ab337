//! Cooldown gate - decides whether a message should trigger a repost

use chrono::{DateTime, Utc};
use crate::domain::entities::StickyEntry;

/// True iff at least `cooldown_ms` has elapsed since the last repost.
///
/// An entry that has never posted in this process always fires. A zero
/// cooldown fires on every qualifying message. A `now` earlier than the last
/// repost gives a negative elapsed time, which never satisfies the cooldown.
pub fn should_fire(entry: &StickyEntry, now: DateTime<Utc>) -> bool {
    let Some(last_sent_at) = entry.last_sent_at else {
        return true;
    };

    let elapsed_ms = now.signed_duration_since(last_sent_at).num_milliseconds();
    let cooldown_ms = i64::try_from(entry.config.cooldown_ms).unwrap_or(i64::MAX);
    elapsed_ms >= 0 && elapsed_ms >= cooldown_ms
}
