//! Domain entities - Core business objects with no external dependencies

pub mod autoresponder;
pub mod command;
pub mod interval;
pub mod member;
pub mod message;
pub mod sticky;
pub mod user;

pub use autoresponder::Autoresponder;
pub use command::ParsedCommand;
pub use interval::{IntervalPost, PostInterval};
pub use member::Member;
pub use message::{Attachment, MentionPolicy, Message, OutgoingMessage};
pub use sticky::{StickyConfig, StickyEntry, DEFAULT_COOLDOWN_MS};
pub use user::User;
