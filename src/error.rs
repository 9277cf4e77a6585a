//! Error types for tgstream

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while resolving, fetching and serving remote files
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Telegram client error: {0}")]
    TelegramClient(String),

    #[error("Telegram authorization required: set a bot token")]
    TelegramAuthRequired,

    /// Path token is not valid base64 or not a `chat:message` pair
    #[error("Invalid stream token")]
    InvalidToken,

    /// The message does not exist or carries no downloadable document
    #[error("No media found for chat {chat_id} message {message_id}")]
    RemoteResolutionFailed { chat_id: i64, message_id: i32 },

    /// Retry budget exhausted while fetching a chunk
    #[error("Fetch failed at offset {offset}: {cause}")]
    RemoteFetchFailed { offset: u64, cause: String },

    /// Telegram answered with something other than a file chunk
    #[error("Unexpected protocol response: {0}")]
    ProtocolMismatch(String),

    #[error("Invalid seek to position {0}")]
    InvalidSeek(i128),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status for errors that reach the stream endpoint
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidToken => 401,
            Error::RemoteResolutionFailed { .. } => 404,
            _ => 500,
        }
    }

    /// Short message suitable for a response body
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::InvalidToken => "Invalid or missing token",
            Error::RemoteResolutionFailed { .. } => "No media found",
            _ => "Internal server error",
        }
    }
}
