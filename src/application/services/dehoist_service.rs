//! Dehoisting - strip leading symbols and digits that push a name to the
//! top of the member list

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::sync::Mutex;

use crate::application::errors::PlatformError;
use crate::domain::entities::Member;
use crate::domain::traits::ChatPlatform;

static HOIST_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?0-9\s]+"#).expect("valid hoist pattern")
});

pub const FALLBACK_NAME: &str = "Unhoisted User";
const AUDIT_REASON: &str = "Dehoisting - Illegal characters at start of name";
const PAGE_SIZE: u16 = 1000;

/// The name a hoisted display name should be changed to, or `None` if it
/// is not hoisted
pub fn dehoisted_name(name: &str) -> Option<String> {
    let hoist = HOIST_CHARS.find(name)?;
    let stripped = name[hoist.end()..].trim();
    Some(if stripped.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        stripped.to_string()
    })
}

pub struct DehoistService {
    platform: Arc<dyn ChatPlatform>,
    /// Last display name checked per (guild, user)
    seen: Mutex<HashMap<(String, String), String>>,
}

impl DehoistService {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            platform,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Check a member that joined or whose display name changed since the
    /// last check. Returns the nickname applied, if any.
    pub async fn check_member(&self, member: &Member) -> Option<String> {
        if member.user.is_bot {
            return None;
        }

        let name = member.display_name();
        {
            let mut seen = self.seen.lock().await;
            let key = (member.guild_id.clone(), member.user.id.clone());
            if seen.get(&key) == Some(&name) {
                return None;
            }
            seen.insert(key, name.clone());
        }

        let new_name = dehoisted_name(&name)?;
        match self
            .platform
            .edit_nickname(&member.guild_id, &member.user.id, &new_name, AUDIT_REASON)
            .await
        {
            Ok(()) => {
                tracing::info!(guild_id = %member.guild_id, user_id = %member.user.id, "Dehoisted \"{}\" to \"{}\"", name, new_name);
                self.seen
                    .lock()
                    .await
                    .insert((member.guild_id.clone(), member.user.id.clone()), new_name.clone());
                Some(new_name)
            }
            // members above the bot's role cannot be renamed
            Err(PlatformError::Forbidden(_)) => {
                tracing::debug!("Cannot dehoist {} in {}: not manageable", member.user.id, member.guild_id);
                None
            }
            Err(e) => {
                tracing::error!("Failed to dehoist {} in {}: {}", member.user.id, member.guild_id, e);
                None
            }
        }
    }

    /// Walk every member of a guild, dehoisting new and renamed ones.
    /// Returns how many were renamed.
    pub async fn sweep(&self, guild_id: &str) -> Result<usize, PlatformError> {
        let mut after: Option<String> = None;
        let mut renamed = 0;

        loop {
            let page = self
                .platform
                .list_members(guild_id, after.as_deref(), PAGE_SIZE)
                .await?;
            for member in &page {
                if self.check_member(member).await.is_some() {
                    renamed += 1;
                }
            }

            match page.last() {
                Some(last) if page.len() == PAGE_SIZE as usize => after = Some(last.user.id.clone()),
                _ => break,
            }
        }

        if renamed > 0 {
            tracing::info!("Dehoisted {} members in {}", renamed, guild_id);
        }
        Ok(renamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::User;
    use crate::test_support::RecordingPlatform;

    #[test]
    fn test_dehoisted_name() {
        assert_eq!(dehoisted_name("!!!Cool Guy").as_deref(), Some("Cool Guy"));
        assert_eq!(dehoisted_name("  01. [admin] x").as_deref(), Some("admin] x"));
        assert_eq!(dehoisted_name("!!! 123").as_deref(), Some(FALLBACK_NAME));
        assert_eq!(dehoisted_name("Lumi!"), None);
        assert_eq!(dehoisted_name("émile"), None);
    }

    fn member(user_id: &str, name: &str) -> Member {
        Member::new("g1", User::new(user_id).with_username(name))
    }

    #[tokio::test]
    async fn test_hoisted_member_is_renamed_once() {
        let platform = RecordingPlatform::new();
        let dehoist = DehoistService::new(platform.clone());

        assert_eq!(dehoist.check_member(&member("u1", "!aaa")).await.as_deref(), Some("aaa"));
        // same name seen again is not re-edited
        assert_eq!(dehoist.check_member(&member("u1", "!aaa")).await, None);
        assert_eq!(
            platform.nicknames(),
            vec![("g1".to_string(), "u1".to_string(), "aaa".to_string())]
        );
    }

    #[tokio::test]
    async fn test_nickname_takes_precedence() {
        let platform = RecordingPlatform::new();
        let dehoist = DehoistService::new(platform.clone());

        let clean_nick = member("u1", "!aaa").with_nickname("Lumi");
        assert_eq!(dehoist.check_member(&clean_nick).await, None);

        let renamed = member("u1", "aaa").with_nickname("...Lumi");
        assert_eq!(dehoist.check_member(&renamed).await.as_deref(), Some("Lumi"));
    }

    #[tokio::test]
    async fn test_bots_and_unmanageable_members_are_left_alone() {
        let platform = RecordingPlatform::new();
        let dehoist = DehoistService::new(platform.clone());

        let bot = Member::new("g1", User::new("b1").with_username("!bot").bot());
        assert_eq!(dehoist.check_member(&bot).await, None);

        platform.fail_nicknames(Some(PlatformError::Forbidden("Missing Permissions".to_string())));
        assert_eq!(dehoist.check_member(&member("owner", "#1 owner")).await, None);
        assert!(platform.nicknames().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_checks_every_member() {
        let platform = RecordingPlatform::new();
        platform.push_member(member("u1", "alice"));
        platform.push_member(member("u2", "!!bob"));
        platform.push_member(member("u3", "007"));
        let dehoist = DehoistService::new(platform.clone());

        assert_eq!(dehoist.sweep("g1").await.unwrap(), 2);
        assert_eq!(dehoist.sweep("g1").await.unwrap(), 0);
        let names: Vec<String> = platform.nicknames().into_iter().map(|(_, _, n)| n).collect();
        assert_eq!(names, vec!["bob".to_string(), FALLBACK_NAME.to_string()]);
    }
}
