use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::application::errors::{CommandError, IntervalError, ResponderError};
use crate::application::messaging::parse_channel_mention;
use crate::application::sticky::StickyService;
use crate::domain::entities::{Message, ParsedCommand};
use super::{AutoresponderService, IntervalService};

static TRAILING_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<#(\d+)>\s*$").expect("valid trailing channel pattern"));

/// Who may run admin commands
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    pub enabled: bool,
    pub users: Vec<String>,
}

impl AdminPolicy {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        if !self.enabled {
            return true; // Admin list disabled, allow all
        }
        self.users.iter().any(|u| u == user_id)
    }
}

/// A parsed `sticky` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickyCommand {
    Set {
        channel_id: Option<String>,
        content: String,
        cooldown_seconds: i64,
        include_warning: bool,
    },
    Remove {
        channel_id: Option<String>,
    },
}

impl StickyCommand {
    /// Parse `sticky add|set [#channel] | <message> [| cooldown=N] [| warning=bool]`
    /// or `sticky remove|disable [#channel]`. Unparseable options keep their defaults.
    pub fn parse(cmd: &ParsedCommand, default_cooldown_seconds: i64, prefix: &str) -> Result<Self, CommandError> {
        let usage = || {
            CommandError::Usage(format!(
                "❌ Usage: `{p}sticky add [#channel] | <message> [| cooldown=<seconds>] [| warning=true|false]` | `{p}sticky remove [#channel]`",
                p = prefix
            ))
        };

        let sub = cmd.subcommand().ok_or_else(usage)?;
        let sub_len = cmd.args.first().map_or(0, |a| a.len());
        let rest = cmd.raw_args[sub_len..].trim();

        match sub.as_str() {
            "add" | "set" => {
                let (target, remainder) = rest.split_once('|').ok_or_else(usage)?;
                let channel_id = parse_channel_mention(target);

                let mut parts = remainder.split('|').map(str::trim).filter(|p| !p.is_empty());
                let content = parts
                    .next()
                    .ok_or_else(|| CommandError::Usage("❌ Sticky message cannot be empty.".to_string()))?
                    .to_string();

                let mut cooldown_seconds = default_cooldown_seconds;
                let mut include_warning = true;
                for option in parts {
                    let (key, value) = option.split_once('=').unwrap_or((option, ""));
                    match key.trim().to_lowercase().as_str() {
                        "cooldown" => {
                            if let Ok(v) = value.trim().parse::<i64>() {
                                if v >= 0 {
                                    cooldown_seconds = v;
                                }
                            }
                        }
                        "warning" => match value.trim().to_lowercase().as_str() {
                            "true" => include_warning = true,
                            "false" => include_warning = false,
                            _ => {}
                        },
                        _ => {}
                    }
                }

                Ok(StickyCommand::Set {
                    channel_id,
                    content,
                    cooldown_seconds,
                    include_warning,
                })
            }
            "remove" | "disable" => {
                let channel_id = rest.split_whitespace().next().and_then(parse_channel_mention);
                Ok(StickyCommand::Remove { channel_id })
            }
            _ => Err(usage()),
        }
    }
}

/// Admin prefix commands: stickies, autoresponders and interval posts
pub struct CommandService {
    stickies: Arc<StickyService>,
    responders: Arc<AutoresponderService>,
    intervals: Arc<IntervalService>,
    policy: AdminPolicy,
    prefix: String,
    default_cooldown_seconds: i64,
}

impl CommandService {
    pub fn new(
        stickies: Arc<StickyService>,
        responders: Arc<AutoresponderService>,
        intervals: Arc<IntervalService>,
        policy: AdminPolicy,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            stickies,
            responders,
            intervals,
            policy,
            prefix: prefix.into(),
            default_cooldown_seconds: 120,
        }
    }

    pub fn with_default_cooldown(mut self, seconds: i64) -> Self {
        self.default_cooldown_seconds = seconds;
        self
    }

    pub fn handles(&self, name: &str) -> bool {
        matches!(
            name,
            "sticky" | "addresponder" | "deleteresponder" | "minkyinterval" | "stopminky"
        )
    }

    /// Run a command from a guild message, returning the reply text
    pub async fn handle(&self, message: &Message, cmd: &ParsedCommand) -> Result<String, CommandError> {
        if !self.handles(&cmd.name) {
            return Err(CommandError::NotFound(cmd.name.clone()));
        }
        let Some(guild_id) = message.guild_id.as_deref() else {
            return Err(CommandError::Usage("❌ This command only works in a server.".to_string()));
        };
        if !self.policy.is_admin(&message.author.id) {
            tracing::warn!("{} tried to run {} without permission", message.author.id, cmd.name);
            return Err(CommandError::PermissionDenied);
        }

        match cmd.name.as_str() {
            "sticky" => self.sticky(guild_id, message, cmd).await,
            "addresponder" => self.add_responder(guild_id, cmd).await,
            "deleteresponder" => self.delete_responder(guild_id, cmd).await,
            "minkyinterval" => self.start_interval(guild_id, cmd).await,
            _ => self.stop_interval(guild_id, cmd).await,
        }
    }

    async fn sticky(&self, guild_id: &str, message: &Message, cmd: &ParsedCommand) -> Result<String, CommandError> {
        match StickyCommand::parse(cmd, self.default_cooldown_seconds, &self.prefix)? {
            StickyCommand::Set {
                channel_id,
                content,
                cooldown_seconds,
                include_warning,
            } => {
                let channel_id = channel_id.unwrap_or_else(|| message.channel_id.clone());
                match self
                    .stickies
                    .set_sticky(guild_id, &channel_id, &content, cooldown_seconds, include_warning)
                    .await
                {
                    Ok(()) => Ok(format!(
                        "✅ Stickied message set in <#{}> (cooldown {}s)",
                        channel_id, cooldown_seconds
                    )),
                    Err(e) => Ok(format!("❌ Failed to set stickied message: {}", e)),
                }
            }
            StickyCommand::Remove { channel_id } => {
                let channel_id = channel_id.unwrap_or_else(|| message.channel_id.clone());
                if self.stickies.remove_sticky(guild_id, &channel_id).await {
                    Ok(format!("✅ Removed stickied message from <#{}>", channel_id))
                } else {
                    Ok("❌ Failed to remove stickied message.".to_string())
                }
            }
        }
    }

    async fn add_responder(&self, guild_id: &str, cmd: &ParsedCommand) -> Result<String, CommandError> {
        let usage = format!(
            "❌ Usage: `{p}addresponder <trigger> | <response> [#channel]`\nExample: `{p}addresponder hello | Hello there!`",
            p = self.prefix
        );
        let (trigger, after) = cmd.raw_args.split_once('|').ok_or(CommandError::Usage(usage))?;

        let (response, channel_id) = match TRAILING_CHANNEL.captures(after) {
            Some(caps) => {
                let start = caps.get(0).map_or(after.len(), |m| m.start());
                (after[..start].trim(), caps.get(1).map(|m| m.as_str().to_string()))
            }
            None => (after.trim(), None),
        };

        let in_channel = channel_id
            .as_ref()
            .map(|c| format!(" in <#{}>", c))
            .unwrap_or_default();

        match self.responders.add(guild_id, trigger, response, channel_id).await {
            Ok(added) => Ok(format!("✅ Autoresponder added for trigger: \"{}\"{}", added.trigger, in_channel)),
            Err(ResponderError::Duplicate(trigger)) => Ok(format!(
                "❌ An autoresponder with trigger \"{}\"{} already exists. Delete it first to replace it.",
                trigger, in_channel
            )),
            Err(e) => Ok(format!("❌ {}", e)),
        }
    }

    async fn delete_responder(&self, guild_id: &str, cmd: &ParsedCommand) -> Result<String, CommandError> {
        if cmd.raw_args.trim().is_empty() {
            return Err(CommandError::Usage(format!(
                "❌ Usage: `{p}deleteresponder <trigger>`\nExample: `{p}deleteresponder hello`",
                p = self.prefix
            )));
        }

        match self.responders.delete(guild_id, &cmd.raw_args).await {
            Ok(removed) => Ok(format!("✅ Autoresponder deleted for trigger: \"{}\"", removed.trigger)),
            Err(e) => Ok(format!("❌ {}", e)),
        }
    }

    async fn start_interval(&self, guild_id: &str, cmd: &ParsedCommand) -> Result<String, CommandError> {
        let [interval, channel] = cmd.args.as_slice() else {
            return Err(CommandError::Usage(format!(
                "❌ Usage: `{p}minkyinterval <interval> <#channel>`\nExample: `{p}minkyinterval 1h #general`",
                p = self.prefix
            )));
        };
        let channel_id = parse_channel_mention(channel).ok_or_else(invalid_channel)?;

        match self.intervals.start(guild_id, &channel_id, interval).await {
            Ok(period) => Ok(format!(
                "✅ Minky images will be sent to <#{}> every {}! Sending the first one now...",
                channel_id, period
            )),
            Err(e @ (IntervalError::InvalidFormat | IntervalError::TooShort(_))) => Ok(format!("❌ {}", e)),
            Err(e) => Ok(format!("❌ Failed to schedule Minky images: {}", e)),
        }
    }

    async fn stop_interval(&self, guild_id: &str, cmd: &ParsedCommand) -> Result<String, CommandError> {
        let [channel] = cmd.args.as_slice() else {
            return Err(CommandError::Usage(format!(
                "❌ Usage: `{p}stopminky <#channel>`\nExample: `{p}stopminky #general`",
                p = self.prefix
            )));
        };
        let channel_id = parse_channel_mention(channel).ok_or_else(invalid_channel)?;

        match self.intervals.stop(guild_id, &channel_id).await {
            Ok(_) => Ok(format!("✅ Stopped scheduled Minky images for <#{}>.", channel_id)),
            Err(IntervalError::NotScheduled(_)) => {
                Ok(format!("❌ No scheduled Minky images found for <#{}>.", channel_id))
            }
            Err(e) => Ok(format!("❌ {}", e)),
        }
    }
}

fn invalid_channel() -> CommandError {
    CommandError::Usage("❌ Invalid channel. Mention a channel like `#general`.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::CommandParser;
    use crate::domain::entities::User;
    use crate::test_support::{FixedImages, FlakyStore, RecordingPlatform};

    fn parse(text: &str) -> ParsedCommand {
        CommandParser::new("!").parse(text).expect("command")
    }

    fn commands(store: &Arc<FlakyStore>, policy: AdminPolicy) -> (CommandService, Arc<StickyService>) {
        let (service, stickies, _) = commands_on(RecordingPlatform::new(), store, policy);
        (service, stickies)
    }

    fn commands_on(
        platform: Arc<RecordingPlatform>,
        store: &Arc<FlakyStore>,
        policy: AdminPolicy,
    ) -> (CommandService, Arc<StickyService>, Arc<IntervalService>) {
        let stickies = Arc::new(StickyService::new(store.clone(), platform.clone()));
        let responders = Arc::new(AutoresponderService::new(store.clone()));
        let intervals = Arc::new(IntervalService::new(store.clone(), platform, FixedImages::new()));
        (
            CommandService::new(Arc::clone(&stickies), responders, Arc::clone(&intervals), policy, "!"),
            stickies,
            intervals,
        )
    }

    fn admin_message(text: &str) -> Message {
        Message::new("c1", User::new("u1"), text).in_guild("g1")
    }

    #[test]
    fn test_parse_sticky_add_with_options() {
        let cmd = parse("!sticky add <#42> | Read the rules | cooldown=30 | warning=false");
        assert_eq!(
            StickyCommand::parse(&cmd, 120, "!").unwrap(),
            StickyCommand::Set {
                channel_id: Some("42".to_string()),
                content: "Read the rules".to_string(),
                cooldown_seconds: 30,
                include_warning: false,
            }
        );
    }

    #[test]
    fn test_parse_sticky_defaults() {
        let cmd = parse("!sticky set | Be nice | cooldown=-5 | warning=maybe");
        assert_eq!(
            StickyCommand::parse(&cmd, 120, "!").unwrap(),
            StickyCommand::Set {
                channel_id: None,
                content: "Be nice".to_string(),
                cooldown_seconds: 120,
                include_warning: true,
            }
        );
    }

    #[test]
    fn test_parse_sticky_errors() {
        for text in ["!sticky", "!sticky add no pipe", "!sticky add |   ", "!sticky frobnicate"] {
            assert!(
                matches!(StickyCommand::parse(&parse(text), 120, "!"), Err(CommandError::Usage(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_parse_sticky_remove() {
        assert_eq!(
            StickyCommand::parse(&parse("!sticky disable <#7>"), 120, "!").unwrap(),
            StickyCommand::Remove {
                channel_id: Some("7".to_string())
            }
        );
        assert_eq!(
            StickyCommand::parse(&parse("!sticky remove"), 120, "!").unwrap(),
            StickyCommand::Remove { channel_id: None }
        );
    }

    #[tokio::test]
    async fn test_sticky_set_and_remove_replies() {
        let store = FlakyStore::new();
        let (service, stickies) = commands(&store, AdminPolicy::allow_all());

        let msg = admin_message("!sticky add | Read the rules | cooldown=60");
        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "✅ Stickied message set in <#c1> (cooldown 60s)");
        assert_eq!(stickies.registry().get("c1").await.unwrap().config.cooldown_ms, 60_000);

        let msg = admin_message("!sticky remove");
        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "✅ Removed stickied message from <#c1>");
        assert!(stickies.registry().get("c1").await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_reply() {
        let store = FlakyStore::new();
        store.set_fail_writes(true);
        let (service, _) = commands(&store, AdminPolicy::allow_all());

        let msg = admin_message("!sticky add | Read the rules");
        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert!(reply.starts_with("❌ Failed to set stickied message: DB_WRITE_FAILED"), "{}", reply);
    }

    #[tokio::test]
    async fn test_non_admin_is_refused() {
        let store = FlakyStore::new();
        let policy = AdminPolicy {
            enabled: true,
            users: vec!["someone-else".to_string()],
        };
        let (service, stickies) = commands(&store, policy);

        let msg = admin_message("!sticky add | nope");
        assert!(matches!(
            service.handle(&msg, &parse(&msg.content)).await,
            Err(CommandError::PermissionDenied)
        ));
        assert!(stickies.registry().get("c1").await.is_none());
    }

    #[tokio::test]
    async fn test_responder_commands() {
        let store = FlakyStore::new();
        let (service, _) = commands(&store, AdminPolicy::allow_all());

        let msg = admin_message("!addresponder Hello | Hello there! <#99>");
        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "✅ Autoresponder added for trigger: \"hello\" in <#99>");

        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert!(reply.contains("already exists"), "{}", reply);

        let msg = admin_message("!deleteresponder hello");
        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "✅ Autoresponder deleted for trigger: \"hello\"");

        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "❌ No autoresponder found with trigger: \"hello\"");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let store = FlakyStore::new();
        let (service, _) = commands(&store, AdminPolicy::allow_all());
        let msg = admin_message("!plugins");
        assert!(matches!(
            service.handle(&msg, &parse(&msg.content)).await,
            Err(CommandError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_interval_commands() {
        let store = FlakyStore::new();
        let platform = RecordingPlatform::new();
        let (service, _, intervals) = commands_on(platform.clone(), &store, AdminPolicy::allow_all());

        let msg = admin_message("!minkyinterval 6h <#55>");
        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "✅ Minky images will be sent to <#55> every 6 hour(s)! Sending the first one now...");
        assert_eq!(platform.sent()[0].channel_id, "55");
        assert_eq!(intervals.active().await.len(), 1);

        let msg = admin_message("!stopminky <#55>");
        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "✅ Stopped scheduled Minky images for <#55>.");

        let reply = service.handle(&msg, &parse(&msg.content)).await.unwrap();
        assert_eq!(reply, "❌ No scheduled Minky images found for <#55>.");
        assert!(intervals.active().await.is_empty());
    }

    #[tokio::test]
    async fn test_interval_command_errors() {
        let store = FlakyStore::new();
        let (service, _) = commands(&store, AdminPolicy::allow_all());

        let reply = |text: &'static str| {
            let msg = admin_message(text);
            let service = &service;
            async move { service.handle(&msg, &parse(&msg.content)).await }
        };

        assert_eq!(
            reply("!minkyinterval 2m <#55>").await.unwrap(),
            "❌ Minimum interval is 5 minutes (5m)."
        );
        assert_eq!(
            reply("!minkyinterval often <#55>").await.unwrap(),
            "❌ Invalid interval format. Use format like: 30m, 1h, 6h, 1d"
        );
        assert!(matches!(
            reply("!minkyinterval 1h general").await,
            Err(CommandError::Usage(u)) if u.contains("Invalid channel")
        ));
        assert!(matches!(
            reply("!minkyinterval 1h").await,
            Err(CommandError::Usage(u)) if u.starts_with("❌ Usage: `!minkyinterval")
        ));
        assert!(matches!(
            reply("!stopminky").await,
            Err(CommandError::Usage(u)) if u.starts_with("❌ Usage: `!stopminky")
        ));
    }
}
