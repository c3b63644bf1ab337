//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite persistence
//! - Storage: In-memory persistence for dev runs
//! - Adapters: Platform integrations (Discord, console)
//! - Images: HTTP image source for interval posts

pub mod config;
pub mod database;
pub mod storage;
pub mod adapters;
pub mod images;
