//! Sticky messages - keep a configured message at the bottom of a channel
//! by reposting it once its cooldown has elapsed.

pub mod cooldown;
pub mod engine;
pub mod flight;
pub mod registry;
pub mod service;


pub use engine::DEFAULT_WARNING_TEXT;
pub use service::StickyService;
