//! SQLite persistence for stickies, autoresponders and interval posts
//!
//! The schema is versioned through a single-row `schema_version` table; each
//! migration runs once, in order. rusqlite is synchronous, so every query
//! runs on the blocking pool behind a shared connection.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::application::errors::StorageError;
use crate::domain::entities::{Autoresponder, IntervalPost, StickyConfig, DEFAULT_COOLDOWN_MS};
use crate::domain::traits::{AutoresponderStore, IntervalStore, StickyStore};

const CURRENT_SCHEMA_VERSION: i64 = 3;

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure(conn, true)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::configure(Connection::open_in_memory()?, false)
    }

    fn configure(conn: Connection, wal: bool) -> Result<Self, StorageError> {
        if wal {
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            if !mode.eq_ignore_ascii_case("wal") {
                tracing::warn!("SQLite kept journal mode {}, WAL unavailable", mode);
            }
        }
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            )",
        )?;

        let current: i64 = conn
            .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        if current > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::Database(format!(
                "schema version {} is newer than supported version {}",
                current, CURRENT_SCHEMA_VERSION
            )));
        }
        if current == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if current < 1 {
            tracing::info!("Applying migration 1: sticky_messages");
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS sticky_messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    guild_id TEXT NOT NULL,
                    channel_id TEXT NOT NULL,
                    content TEXT NOT NULL,
                    last_message_id TEXT,
                    cooldown_ms INTEGER NOT NULL DEFAULT 120000,
                    include_warning INTEGER NOT NULL DEFAULT 1,
                    UNIQUE(guild_id, channel_id)
                )",
            )?;
        }

        if current < 2 {
            tracing::info!("Applying migration 2: autoresponders");
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS autoresponders (
                    guild_id TEXT NOT NULL,
                    trigger_phrase TEXT NOT NULL,
                    response TEXT NOT NULL,
                    channel_id TEXT NOT NULL DEFAULT '',
                    PRIMARY KEY (guild_id, trigger_phrase, channel_id)
                )",
            )?;
        }

        if current < 3 {
            tracing::info!("Applying migration 3: interval_posts");
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS interval_posts (
                    guild_id TEXT NOT NULL,
                    channel_id TEXT NOT NULL,
                    interval_str TEXT NOT NULL,
                    interval_ms INTEGER NOT NULL,
                    PRIMARY KEY (guild_id, channel_id)
                )",
            )?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Database(format!("blocking task failed: {}", e)))?
    }
}

fn sticky_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StickyConfig> {
    let cooldown_ms: Option<i64> = row.get(4)?;
    let include_warning: Option<i64> = row.get(5)?;
    Ok(StickyConfig {
        guild_id: row.get(0)?,
        channel_id: row.get(1)?,
        content: row.get(2)?,
        last_message_id: row.get::<_, Option<String>>(3)?.filter(|id| !id.is_empty()),
        cooldown_ms: cooldown_ms
            .and_then(|ms| u64::try_from(ms).ok())
            .unwrap_or(DEFAULT_COOLDOWN_MS),
        include_warning: include_warning.map_or(true, |w| w != 0),
    })
}

#[async_trait]
impl StickyStore for Database {
    async fn load_stickies(&self) -> Result<Vec<StickyConfig>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT guild_id, channel_id, content, last_message_id, cooldown_ms, include_warning
                 FROM sticky_messages ORDER BY id",
            )?;
            let rows = stmt.query_map([], sticky_from_row)?;

            let mut stickies = Vec::new();
            for sticky in rows {
                stickies.push(sticky?);
            }
            Ok(stickies)
        })
        .await
    }

    async fn upsert_sticky(&self, config: &StickyConfig) -> Result<(), StorageError> {
        let config = config.clone();
        let cooldown_ms = i64::try_from(config.cooldown_ms)
            .map_err(|_| StorageError::Serialization(format!("cooldown {} out of range", config.cooldown_ms)))?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sticky_messages (guild_id, channel_id, content, last_message_id, cooldown_ms, include_warning)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(guild_id, channel_id) DO UPDATE SET
                   content = excluded.content,
                   cooldown_ms = excluded.cooldown_ms,
                   include_warning = excluded.include_warning",
                params![
                    config.guild_id,
                    config.channel_id,
                    config.content,
                    config.last_message_id,
                    cooldown_ms,
                    config.include_warning as i64
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_sticky(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError> {
        let guild_id = guild_id.to_string();
        let channel_id = channel_id.to_string();
        self.with_conn(move |conn| {
            let rows = conn.execute(
                "DELETE FROM sticky_messages WHERE guild_id = ?1 AND channel_id = ?2",
                params![guild_id, channel_id],
            )?;
            Ok(rows > 0)
        })
        .await
    }

    async fn set_last_message_id(
        &self,
        guild_id: Option<&str>,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), StorageError> {
        let guild_id = guild_id.map(str::to_string);
        let channel_id = channel_id.to_string();
        let message_id = message_id.to_string();
        self.with_conn(move |conn| {
            match guild_id {
                Some(guild_id) => conn.execute(
                    "UPDATE sticky_messages SET last_message_id = ?1 WHERE guild_id = ?2 AND channel_id = ?3",
                    params![message_id, guild_id, channel_id],
                )?,
                None => conn.execute(
                    "UPDATE sticky_messages SET last_message_id = ?1 WHERE channel_id = ?2",
                    params![message_id, channel_id],
                )?,
            };
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AutoresponderStore for Database {
    async fn load_autoresponders(&self) -> Result<Vec<Autoresponder>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT guild_id, trigger_phrase, response, channel_id FROM autoresponders",
            )?;
            let rows = stmt.query_map([], |row| {
                let channel_id: String = row.get(3)?;
                Ok(Autoresponder {
                    guild_id: row.get(0)?,
                    trigger: row.get(1)?,
                    response: row.get(2)?,
                    channel_id: Some(channel_id).filter(|c| !c.is_empty()),
                })
            })?;

            let mut responders = Vec::new();
            for responder in rows {
                responders.push(responder?);
            }
            Ok(responders)
        })
        .await
    }

    async fn save_autoresponder(&self, responder: &Autoresponder) -> Result<(), StorageError> {
        let responder = responder.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO autoresponders (guild_id, trigger_phrase, response, channel_id)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(guild_id, trigger_phrase, channel_id) DO UPDATE SET response = excluded.response",
                params![
                    responder.guild_id,
                    responder.trigger,
                    responder.response,
                    responder.channel_id.unwrap_or_default()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_autoresponder(
        &self,
        guild_id: &str,
        trigger: &str,
        channel_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let guild_id = guild_id.to_string();
        let trigger = trigger.to_string();
        let channel_id = channel_id.unwrap_or_default().to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM autoresponders WHERE guild_id = ?1 AND trigger_phrase = ?2 AND channel_id = ?3",
                params![guild_id, trigger, channel_id],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl IntervalStore for Database {
    async fn load_intervals(&self) -> Result<Vec<IntervalPost>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT guild_id, channel_id, interval_str, interval_ms FROM interval_posts",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;

            let mut posts = Vec::new();
            for row in rows {
                let (guild_id, channel_id, interval, interval_ms) = row?;
                match u64::try_from(interval_ms) {
                    Ok(interval_ms) if interval_ms > 0 => posts.push(IntervalPost {
                        guild_id,
                        channel_id,
                        interval,
                        interval_ms,
                    }),
                    _ => tracing::warn!("Skipping interval post for {} with period {}ms", channel_id, interval_ms),
                }
            }
            Ok(posts)
        })
        .await
    }

    async fn save_interval(&self, post: &IntervalPost) -> Result<(), StorageError> {
        let post = post.clone();
        let interval_ms = i64::try_from(post.interval_ms)
            .map_err(|_| StorageError::Serialization(format!("interval {} out of range", post.interval_ms)))?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO interval_posts (guild_id, channel_id, interval_str, interval_ms)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(guild_id, channel_id) DO UPDATE SET
                   interval_str = excluded.interval_str,
                   interval_ms = excluded.interval_ms",
                params![post.guild_id, post.channel_id, post.interval, interval_ms],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_interval(&self, guild_id: &str, channel_id: &str) -> Result<bool, StorageError> {
        let guild_id = guild_id.to_string();
        let channel_id = channel_id.to_string();
        self.with_conn(move |conn| {
            let rows = conn.execute(
                "DELETE FROM interval_posts WHERE guild_id = ?1 AND channel_id = ?2",
                params![guild_id, channel_id],
            )?;
            Ok(rows > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_key() {
        let db = Database::in_memory().unwrap();
        db.upsert_sticky(&StickyConfig::new("g1", "c1", "first", 120_000, true))
            .await
            .unwrap();
        db.upsert_sticky(&StickyConfig::new("g1", "c1", "second", 30_000, false))
            .await
            .unwrap();

        let rows = db.load_stickies().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "second");
        assert_eq!(rows[0].cooldown_ms, 30_000);
        assert!(!rows[0].include_warning);
    }

    #[tokio::test]
    async fn test_upsert_keeps_last_message_id() {
        let db = Database::in_memory().unwrap();
        db.upsert_sticky(&StickyConfig::new("g1", "c1", "first", 0, true))
            .await
            .unwrap();
        db.set_last_message_id(Some("g1"), "c1", "1234").await.unwrap();

        db.upsert_sticky(&StickyConfig::new("g1", "c1", "second", 0, true))
            .await
            .unwrap();

        let rows = db.load_stickies().await.unwrap();
        assert_eq!(rows[0].last_message_id.as_deref(), Some("1234"));
    }

    #[tokio::test]
    async fn test_last_message_id_by_channel_only() {
        let db = Database::in_memory().unwrap();
        db.upsert_sticky(&StickyConfig::new("g1", "c1", "x", 0, true))
            .await
            .unwrap();
        db.set_last_message_id(None, "c1", "55").await.unwrap();
        assert_eq!(db.load_stickies().await.unwrap()[0].last_message_id.as_deref(), Some("55"));
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let db = Database::in_memory().unwrap();
        db.upsert_sticky(&StickyConfig::new("g1", "c1", "x", 0, true))
            .await
            .unwrap();
        assert!(db.delete_sticky("g1", "c1").await.unwrap());
        assert!(!db.delete_sticky("g1", "c1").await.unwrap());
        assert!(db.load_stickies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_rows_get_defaults() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sticky_messages (guild_id, channel_id, content, last_message_id)
                 VALUES ('g1', 'c1', 'legacy', '')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let rows = db.load_stickies().await.unwrap();
        assert_eq!(rows[0].cooldown_ms, DEFAULT_COOLDOWN_MS);
        assert!(rows[0].include_warning);
        assert_eq!(rows[0].last_message_id, None);
    }

    #[tokio::test]
    async fn test_migrations_run_once() {
        let db = Database::in_memory().unwrap();
        let version: i64 = db
            .with_conn(|conn| {
                Database::migrate(conn)?;
                Ok(conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_autoresponder_round_trip() {
        let db = Database::in_memory().unwrap();
        db.save_autoresponder(&Autoresponder::new("g1", "hello", "hi", None))
            .await
            .unwrap();
        db.save_autoresponder(&Autoresponder::new("g1", "rules", "see <#9>", Some("c2".to_string())))
            .await
            .unwrap();

        let mut rows = db.load_autoresponders().await.unwrap();
        rows.sort_by(|a, b| a.trigger.cmp(&b.trigger));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].channel_id, None);
        assert_eq!(rows[1].channel_id.as_deref(), Some("c2"));

        db.delete_autoresponder("g1", "rules", Some("c2")).await.unwrap();
        assert_eq!(db.load_autoresponders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_interval_posts_persist_per_channel() {
        let db = Database::in_memory().unwrap();
        let post = |interval: &str, ms: u64| IntervalPost {
            guild_id: "g1".to_string(),
            channel_id: "c1".to_string(),
            interval: interval.to_string(),
            interval_ms: ms,
        };
        db.save_interval(&post("1h", 3_600_000)).await.unwrap();
        db.save_interval(&post("1d", 86_400_000)).await.unwrap();

        assert_eq!(db.load_intervals().await.unwrap(), vec![post("1d", 86_400_000)]);
        assert!(db.delete_interval("g1", "c1").await.unwrap());
        assert!(!db.delete_interval("g1", "c1").await.unwrap());
        assert!(db.load_intervals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interval_with_bad_period_is_skipped() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO interval_posts (guild_id, channel_id, interval_str, interval_ms)
                 VALUES ('g1', 'c1', '0m', 0), ('g1', 'c2', '1h', 3600000)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let posts = db.load_intervals().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel_id, "c2");
    }
}
