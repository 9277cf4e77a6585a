//! Seekable access to remote documents
//!
//! A [`VirtualFile`] reads a Telegram document as if it were a local
//! file, pulling chunks through a [`ChunkCache`](crate::cache::ChunkCache)
//! backed by a [`ChunkFetcher`].

mod fetcher;
mod file;

pub use fetcher::ChunkFetcher;
pub use file::VirtualFile;
