//! tgstream - HTTP byte-range streaming of Telegram media
//!
//! Serves documents attached to Telegram messages over plain HTTP so that
//! media players can seek through them. Each file is read on demand in
//! aligned chunks, with a small per-file cache in front of Telegram.

pub mod cache;
pub mod config;
pub mod error;
pub mod server;
pub mod stream;
pub mod telegram;
pub mod token;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::stream::VirtualFile;
    pub use crate::telegram::{MessageRef, RemoteLocation};
}
