use super::User;

/// A user's membership in a guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub guild_id: String,
    pub user: User,
    /// Guild-specific nickname, if one is set
    pub nickname: Option<String>,
}

impl Member {
    pub fn new(guild_id: impl Into<String>, user: User) -> Self {
        Self {
            guild_id: guild_id.into(),
            user,
            nickname: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Name shown in the member list: nickname first, then the user's name
    pub fn display_name(&self) -> String {
        match &self.nickname {
            Some(nick) => nick.clone(),
            None => self.user.shown_name(),
        }
    }
}
