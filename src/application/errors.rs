//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors reported by the chat platform transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Unknown message or channel: {0}")]
    NotFound(String),

    #[error("Missing permissions: {0}")]
    Forbidden(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl PlatformError {
    /// Errors that routinely happen when deleting an old post: a moderator
    /// removed it already, or the bot lost its permissions.
    pub fn is_expected_on_delete(&self) -> bool {
        matches!(self, PlatformError::NotFound(_) | PlatformError::Forbidden(_))
    }
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    NotFound(String),

    #[error("{0}")]
    Usage(String),

    #[error("Permission denied")]
    PermissionDenied,
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Sticky configuration errors returned to admin commands
#[derive(Error, Debug)]
pub enum StickyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("DB_WRITE_FAILED: {0}")]
    Store(#[from] StorageError),
}

/// Autoresponder management errors
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("An autoresponder with trigger \"{0}\" already exists. Delete it first to replace it.")]
    Duplicate(String),

    #[error("No autoresponder found with trigger: \"{0}\"")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StorageError),
}

/// Interval post scheduling errors
#[derive(Error, Debug)]
pub enum IntervalError {
    #[error("Invalid interval format. Use format like: 30m, 1h, 6h, 1d")]
    InvalidFormat,

    #[error("Minimum interval is {0} minutes ({0}m).")]
    TooShort(u64),

    #[error("No scheduled post in channel {0}")]
    NotScheduled(String),

    #[error("Storage error: {0}")]
    Store(#[from] StorageError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
