/// A prefix command split out of a chat message, e.g. `!sticky add | text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased command name without the prefix
    pub name: String,
    /// Whitespace separated arguments
    pub args: Vec<String>,
    /// Everything after the command name, trimmed
    pub raw_args: String,
}

impl ParsedCommand {
    /// First argument, lowercased
    pub fn subcommand(&self) -> Option<String> {
        self.args.first().map(|a| a.to_lowercase())
    }
}
