//! Command parser - Splits prefix commands out of chat messages

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::domain::entities::ParsedCommand;

static CHANNEL_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<#(\d+)>$").expect("valid channel mention pattern"));

/// Parses prefix commands such as `!sticky add | text`
pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Parse a message body, returning `None` for anything that is not a command
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let text = text.trim();
        if self.prefix.is_empty() || !starts_with_ignore_case(text, &self.prefix) {
            return None;
        }

        let without_prefix = text[self.prefix.len()..].trim();
        let mut parts = without_prefix.split_whitespace();
        let name = parts.next()?;
        let args = parts.map(|s| s.to_string()).collect();
        let raw_args = without_prefix[name.len()..].trim().to_string();

        Some(ParsedCommand {
            name: name.to_lowercase(),
            args,
            raw_args,
        })
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}

/// Channel id from a `<#123>` mention
pub fn parse_channel_mention(arg: &str) -> Option<String> {
    CHANNEL_MENTION
        .captures(arg.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
