//! Per-file chunk cache
//!
//! Holds a bounded number of fetched chunks keyed by their aligned
//! offset. Misses go to the chunk fetcher; the lock is never held while
//! a fetch is in flight, so two concurrent misses on one key may both
//! fetch it.

mod locality;

pub use locality::LocalityMap;

use crate::error::Result;
use crate::stream::ChunkFetcher;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

/// Bounded cache of chunks for one remote file
pub struct ChunkCache {
    fetcher: ChunkFetcher,
    chunk_size: u64,
    chunks: Mutex<LocalityMap<Bytes>>,
}

impl ChunkCache {
    /// Create a cache of `capacity` chunks of `chunk_size` bytes each
    pub fn new(fetcher: ChunkFetcher, chunk_size: u64, capacity: usize) -> Self {
        ChunkCache {
            fetcher,
            chunk_size: chunk_size.max(1),
            chunks: Mutex::new(LocalityMap::new(capacity)),
        }
    }

    /// Key of the chunk containing `offset`
    pub fn key_for(&self, offset: u64) -> u64 {
        offset - offset % self.chunk_size
    }

    /// Chunk starting at `key`, fetching it on a miss
    pub async fn get(&self, key: u64) -> Result<Bytes> {
        debug_assert_eq!(key % self.chunk_size, 0, "unaligned chunk key");

        let cached = self.chunks.lock().get(key);
        if let Some(chunk) = cached {
            return Ok(chunk);
        }

        let chunk = self.fetcher.fetch(key, self.chunk_size).await?;
        let expected = self.expected_len(key);
        if chunk.is_empty() || chunk.len() as u64 != expected {
            debug!(
                "Not caching chunk at {}: got {} of {} bytes",
                key,
                chunk.len(),
                expected
            );
        } else if let Some(evicted) = self.chunks.lock().insert(key, chunk.clone()) {
            debug!("Evicted chunk at {} for chunk at {}", evicted, key);
        }

        Ok(chunk)
    }

    /// Bytes a complete chunk at `key` holds
    fn expected_len(&self, key: u64) -> u64 {
        let size = self.fetcher.location().size;
        (key + self.chunk_size).min(size).saturating_sub(key)
    }

    /// Number of cached chunks
    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.chunks.lock().is_empty()
    }

    /// Maximum number of cached chunks
    pub fn capacity(&self) -> usize {
        self.chunks.lock().capacity()
    }
}
