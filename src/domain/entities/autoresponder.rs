/// Keyword responder for a guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autoresponder {
    pub guild_id: String,
    /// Stored lowercased; matched as a substring of the lowercased message
    pub trigger: String,
    pub response: String,
    /// Restricts the responder to one channel when set
    pub channel_id: Option<String>,
}

impl Autoresponder {
    pub fn new(
        guild_id: impl Into<String>,
        trigger: impl Into<String>,
        response: impl Into<String>,
        channel_id: Option<String>,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            trigger: trigger.into().to_lowercase(),
            response: response.into(),
            channel_id,
        }
    }

    /// Whether this responder fires for `content` posted in `channel_id`
    pub fn matches(&self, channel_id: &str, content: &str) -> bool {
        let channel_ok = self
            .channel_id
            .as_deref()
            .map_or(true, |restricted| restricted == channel_id);
        channel_ok && content.to_lowercase().contains(&self.trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_case_insensitive() {
        let r = Autoresponder::new("g1", "Hello", "Hi there!", None);
        assert_eq!(r.trigger, "hello");
        assert!(r.matches("c1", "well HELLO everyone"));
        assert!(!r.matches("c1", "goodbye"));
    }

    #[test]
    fn test_channel_restriction() {
        let r = Autoresponder::new("g1", "rules", "Read #rules", Some("c2".to_string()));
        assert!(r.matches("c2", "where are the rules"));
        assert!(!r.matches("c1", "where are the rules"));
    }
}
