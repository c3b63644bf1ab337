//! Test doubles for the platform and the store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::errors::{PlatformError, StorageError};
use crate::domain::entities::{
    Attachment, Autoresponder, IntervalPost, Member, Message, OutgoingMessage, StickyConfig,
};
use crate::domain::traits::{
    AutoresponderStore, BotInfo, ChatPlatform, ImageSource, IntervalStore, StickyStore,
};
use crate::infrastructure::storage::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: String,
    pub message_id: String,
    pub message: OutgoingMessage,
}

/// Platform double that records every call
#[derive(Default)]
pub struct RecordingPlatform {
    next_id: AtomicU64,
    pub sent: Mutex<Vec<SentMessage>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    pub send_error: Mutex<Option<PlatformError>>,
    pub delete_error: Mutex<Option<PlatformError>>,
    pub history: Mutex<HashMap<String, Vec<Message>>>,
    pub fetch_error: Mutex<Option<PlatformError>>,
    pub members: Mutex<Vec<Member>>,
    pub nicknames: Mutex<Vec<(String, String, String)>>,
    pub nickname_error: Mutex<Option<PlatformError>>,
}

impl RecordingPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, error: Option<PlatformError>) {
        *self.send_error.lock().unwrap() = error;
    }

    pub fn fail_deletes(&self, error: Option<PlatformError>) {
        *self.delete_error.lock().unwrap() = error;
    }

    pub fn push_history(&self, message: Message) {
        self.history
            .lock()
            .unwrap()
            .entry(message.channel_id.clone())
            .or_default()
            .push(message);
    }

    pub fn fail_fetches(&self, error: Option<PlatformError>) {
        *self.fetch_error.lock().unwrap() = error;
    }

    pub fn push_member(&self, member: Member) {
        self.members.lock().unwrap().push(member);
    }

    /// Nickname edits as (guild, user, nickname)
    pub fn nicknames(&self) -> Vec<(String, String, String)> {
        self.nicknames.lock().unwrap().clone()
    }

    pub fn fail_nicknames(&self, error: Option<PlatformError>) {
        *self.nickname_error.lock().unwrap() = error;
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn send_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<String, PlatformError> {
        if let Some(e) = self.send_error.lock().unwrap().clone() {
            return Err(e);
        }
        let message_id = format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().unwrap().push(SentMessage {
            channel_id: channel_id.to_string(),
            message_id: message_id.clone(),
            message: message.clone(),
        });
        Ok(message_id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), PlatformError> {
        self.deleted
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message_id.to_string()));
        match self.delete_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn fetch_messages_after(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<Message>, PlatformError> {
        if let Some(e) = self.fetch_error.lock().unwrap().clone() {
            return Err(e);
        }
        let history = self.history.lock().unwrap();
        let messages = history.get(channel_id).cloned().unwrap_or_default();
        let start = after
            .and_then(|id| messages.iter().position(|m| m.id == id).map(|i| i + 1))
            .unwrap_or(0);
        // without a cursor the newest messages come back
        let start = match after {
            Some(_) => start,
            None => messages.len().saturating_sub(limit as usize),
        };
        Ok(messages.into_iter().skip(start).take(limit as usize).collect())
    }

    async fn list_members(
        &self,
        guild_id: &str,
        after: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Member>, PlatformError> {
        let mut members: Vec<Member> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.guild_id == guild_id)
            .filter(|m| after.map_or(true, |a| m.user.id.as_str() > a))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.user.id.cmp(&b.user.id));
        members.truncate(limit as usize);
        Ok(members)
    }

    async fn edit_nickname(
        &self,
        guild_id: &str,
        user_id: &str,
        nickname: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        if let Some(e) = self.nickname_error.lock().unwrap().clone() {
            return Err(e);
        }
        for member in self.members.lock().unwrap().iter_mut() {
            if member.guild_id == guild_id && member.user.id == user_id {
                member.nickname = Some(nickname.to_string());
            }
        }
        self.nicknames
            .lock()
            .unwrap()
            .push((guild_id.to_string(), user_id.to_string(), nickname.to_string()));
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "bot".to_string(),
            username: "stickybot".to_string(),
        }
    }
}

/// Store double whose operations can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub upserts: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn outage(op: &str) -> StorageError {
        StorageError::Database(format!("{}: connection refused", op))
    }
}

#[async_trait]
impl StickyStore for FlakyStore {
    async fn load_stickies(&self) -> Result<Vec<StickyConfig>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage("load"));
        }
        self.inner.load_stickies().await
    }

    async fn upsert_sticky(&self, config: &StickyConfig) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::outage("upsert"));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_sticky(config).await
    }

    async fn delete_sticky(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::outage("delete"));
        }
        self.inner.delete_sticky(guild_id, channel_id).await
    }

    async fn set_last_message_id(
        &self,
        guild_id: Option<&str>,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::outage("update"));
        }
        self.inner.set_last_message_id(guild_id, channel_id, message_id).await
    }
}

#[async_trait]
impl AutoresponderStore for FlakyStore {
    async fn load_autoresponders(&self) -> Result<Vec<Autoresponder>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage("load"));
        }
        self.inner.load_autoresponders().await
    }

    async fn save_autoresponder(&self, responder: &Autoresponder) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::outage("save"));
        }
        self.inner.save_autoresponder(responder).await
    }

    async fn delete_autoresponder(
        &self,
        guild_id: &str,
        trigger: &str,
        channel_id: Option<&str>,
    ) -> Result<(), StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::outage("delete"));
        }
        self.inner.delete_autoresponder(guild_id, trigger, channel_id).await
    }
}

#[async_trait]
impl IntervalStore for FlakyStore {
    async fn load_intervals(&self) -> Result<Vec<IntervalPost>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage("load"));
        }
        self.inner.load_intervals().await
    }

    async fn save_interval(&self, post: &IntervalPost) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::outage("save"));
        }
        self.inner.save_interval(post).await
    }

    async fn delete_interval(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::outage("delete"));
        }
        self.inner.delete_interval(guild_id, channel_id).await
    }
}

/// Image source that always hands back the same small file
#[derive(Default)]
pub struct FixedImages {
    pub error: Mutex<Option<PlatformError>>,
}

impl FixedImages {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, error: Option<PlatformError>) {
        *self.error.lock().unwrap() = error;
    }
}

#[async_trait]
impl ImageSource for FixedImages {
    async fn fetch_image(&self) -> Result<Attachment, PlatformError> {
        if let Some(e) = self.error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(Attachment {
            filename: "minky.jpg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
        })
    }
}
