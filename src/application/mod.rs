//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Sticky: the sticky-message registry, cooldown gate and repost engine
//! - Services: admin commands, autoresponders and the message watcher
//! - Errors: Domain-specific errors
//! - Messaging: prefix command parsing

pub mod errors;
pub mod messaging;
pub mod services;
pub mod sticky;
