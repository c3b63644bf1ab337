//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::application::services::interval_service::{DEFAULT_CAPTION, DEFAULT_MIN_INTERVAL_MINUTES};
use crate::application::services::AdminPolicy;
use crate::application::sticky::DEFAULT_WARNING_TEXT;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub sticky: StickyConfig,
    pub discord: DiscordConfig,
    pub admins: AdminsConfig,
    #[serde(default)]
    pub intervals: IntervalsConfig,
    #[serde(default)]
    pub dehoist: DehoistConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StickyConfig {
    pub default_cooldown_seconds: i64,
    pub warning_text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscordConfig {
    pub enabled: bool,
    pub token: Option<String>,
    pub api_base: String,
    pub poll_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub watch_channels: Vec<WatchedChannel>,
}

/// A channel polled for commands even before it has a sticky
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatchedChannel {
    pub guild_id: String,
    pub channel_id: String,
}

/// Users allowed to run admin commands
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdminsConfig {
    pub enabled: bool,
    pub users: Vec<String>,
}

/// Scheduled image posts
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IntervalsConfig {
    pub image_url: String,
    pub caption: String,
    pub min_interval_minutes: u64,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            image_url: "https://minky.materii.dev".to_string(),
            caption: DEFAULT_CAPTION.to_string(),
            min_interval_minutes: DEFAULT_MIN_INTERVAL_MINUTES,
        }
    }
}

/// Nickname dehoisting
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DehoistConfig {
    pub enabled: bool,
    pub sweep_interval_seconds: u64,
}

impl Default for DehoistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_seconds: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "stickybot".to_string(),
                prefix: "!".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("stickybot.db"),
            },
            sticky: StickyConfig {
                default_cooldown_seconds: 120,
                warning_text: DEFAULT_WARNING_TEXT.to_string(),
            },
            discord: DiscordConfig {
                enabled: false,
                token: None,
                api_base: "https://discord.com/api/v10".to_string(),
                poll_interval_seconds: 5,
                request_timeout_seconds: 15,
                watch_channels: Vec::new(),
            },
            admins: AdminsConfig {
                enabled: true,
                users: Vec::new(),
            },
            intervals: IntervalsConfig::default(),
            dehoist: DehoistConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.prefix".to_string()));
        }
        if self.sticky.default_cooldown_seconds < 0 {
            return Err(ConfigError::InvalidValue(format!(
                "sticky.default-cooldown-seconds must be >= 0, got {}",
                self.sticky.default_cooldown_seconds
            )));
        }
        if self.discord.enabled && self.discord.token.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingField("discord.token".to_string()));
        }
        if self.discord.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "discord.poll-interval-seconds must be at least 1".to_string(),
            ));
        }
        if self.intervals.image_url.trim().is_empty() {
            return Err(ConfigError::MissingField("intervals.image-url".to_string()));
        }
        if self.dehoist.enabled && self.dehoist.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "dehoist.sweep-interval-seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn admin_policy(&self) -> AdminPolicy {
        AdminPolicy {
            enabled: self.admins.enabled,
            users: self.admins.users.clone(),
        }
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Environment overrides on top of file or default values
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.is_empty() {
                self.discord.token = Some(token);
                self.discord.enabled = true;
            }
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            if !prefix.trim().is_empty() {
                self.bot.prefix = prefix;
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("default-cooldown-seconds: 120"));
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.bot.prefix, "!");
        assert_eq!(parsed.sticky.warning_text, DEFAULT_WARNING_TEXT);
    }

    #[test]
    fn test_watch_channels_parse() {
        let yaml = r#"
bot:
  name: stickybot
  prefix: "l!"
database:
  path: /var/lib/stickybot/bot.db
sticky:
  default-cooldown-seconds: 60
  warning-text: "(automated)"
discord:
  enabled: true
  token: abc
  api-base: https://discord.com/api/v10
  poll-interval-seconds: 3
  request-timeout-seconds: 10
  watch-channels:
    - guild-id: "811255666990907402"
      channel-id: "824357609778708580"
admins:
  enabled: true
  users: ["1"]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.bot.prefix, "l!");
        assert_eq!(config.discord.watch_channels.len(), 1);
        assert_eq!(config.discord.watch_channels[0].channel_id, "824357609778708580");
        assert!(config.admin_policy().is_admin("1"));
        assert!(!config.admin_policy().is_admin("2"));
    }

    #[test]
    fn test_enabled_discord_requires_token() {
        let mut config = Config::default();
        config.discord.enabled = true;
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_negative_default_cooldown_is_rejected() {
        let mut config = Config::default();
        config.sticky.default_cooldown_seconds = -1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_missing_sections_take_defaults() {
        let yaml = r#"
bot: {name: stickybot, prefix: "!"}
database: {path: bot.db}
sticky: {default-cooldown-seconds: 120, warning-text: "x"}
discord: {enabled: false, api-base: "http://localhost", poll-interval-seconds: 5, request-timeout-seconds: 15}
admins: {enabled: false, users: []}
dehoist: {sweep-interval-seconds: 300}
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.intervals.image_url, "https://minky.materii.dev");
        assert_eq!(config.intervals.min_interval_minutes, 5);
        assert!(config.dehoist.enabled);
        assert_eq!(config.dehoist.sweep_interval_seconds, 300);
    }

    #[test]
    fn test_zero_dehoist_sweep_is_rejected() {
        let mut config = Config::default();
        config.dehoist.sweep_interval_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
        config.dehoist.enabled = false;
        assert!(config.validate().is_ok());
    }
}
