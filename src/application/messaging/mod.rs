//! Message handling - prefix command parsing

pub mod parser;

pub use parser::{parse_channel_mention, CommandParser};
