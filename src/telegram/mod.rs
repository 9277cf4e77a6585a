//! Telegram backend module
//!
//! Handles everything that talks to Telegram:
//! - Signing in and resolving messages to downloadable documents
//! - Per data center senders, pooled for the life of the process
//! - Backoff for transient failures and flood waits

mod client;
mod location;
mod pool;
mod rate_limit;
mod sender;

#[cfg(test)]
pub(crate) mod memory;

pub use client::{GrammersConnector, GrammersSender, TelegramBackend};
pub use location::{MessageRef, MetadataResolver, RemoteLocation};
pub use pool::SenderPool;
pub use rate_limit::{flood_wait, ExponentialBackoff};
pub use sender::{DcSender, SenderConnector, SenderError};

/// Largest window `upload.getFile` will return in one call (1MB)
pub const MAX_CHUNK_SIZE: u64 = 1024 * 1024;

/// Offsets and limits passed to `upload.getFile` must be multiples of this
pub const ALIGNMENT: u64 = 1024;

/// MIME type used when a document does not declare one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
