//! Domain layer - Core business types with no infrastructure dependencies
//!
//! This layer contains:
//! - Entities: Core business objects (StickyConfig, Message, Autoresponder)
//! - Traits: Abstractions for infrastructure (ChatPlatform, StickyStore)

pub mod entities;
pub mod traits;
