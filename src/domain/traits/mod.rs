//! Domain traits - Abstractions for infrastructure implementations

pub mod platform;
pub mod store;

pub use platform::{BotInfo, ChatPlatform, ImageSource};
pub use store::{AutoresponderStore, IntervalStore, StickyStore};
