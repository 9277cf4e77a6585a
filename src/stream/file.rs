//! Virtual file over a remote document

use crate::cache::ChunkCache;
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::stream::ChunkFetcher;
use crate::telegram::{DcSender, MessageRef, MetadataResolver, RemoteLocation, SenderPool};
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::sync::Arc;
use tracing::warn;

/// Seekable byte stream over one remote document
///
/// The position always stays within `[0, size]`.
pub struct VirtualFile {
    location: Arc<RemoteLocation>,
    cache: ChunkCache,
    position: Mutex<u64>,
}

impl VirtualFile {
    /// Resolve `message` and bind a file to the sender for its data center
    pub async fn open(
        message: MessageRef,
        resolver: &dyn MetadataResolver,
        pool: &SenderPool,
        config: &StreamConfig,
    ) -> Result<Self> {
        let location = resolver.resolve(message).await?;
        let sender = pool.get_or_create(location.dc_id).await?;
        Ok(Self::new(location, sender, config))
    }

    /// Create a file reading `location` through `sender`
    pub fn new(
        location: RemoteLocation,
        sender: Arc<dyn DcSender>,
        config: &StreamConfig,
    ) -> Self {
        let location = Arc::new(location);
        let fetcher = ChunkFetcher::new(sender, Arc::clone(&location), config);

        VirtualFile {
            location,
            cache: ChunkCache::new(fetcher, config.chunk_size, config.cache_capacity),
            position: Mutex::new(0),
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.location.size
    }

    /// Declared MIME type
    pub fn mime_type(&self) -> &str {
        &self.location.mime_type
    }

    /// Resolved remote location
    pub fn location(&self) -> &RemoteLocation {
        &self.location
    }

    /// Current read position
    pub fn position(&self) -> u64 {
        *self.position.lock()
    }

    /// Chunk cache backing this file
    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Move the read position; results past the end are clamped to the end
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let size = self.size() as i128;
        let mut position = self.position.lock();

        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => *position as i128 + delta as i128,
            SeekFrom::End(delta) => size + delta as i128,
        };

        if target < 0 {
            return Err(Error::InvalidSeek(target));
        }

        *position = target.min(size) as u64;
        Ok(*position)
    }

    /// Read into `buf`, returning the number of bytes copied
    ///
    /// Returns 0 only at end of file. Data ending before the declared size
    /// is reported as `RemoteFetchFailed`. If a chunk fetch fails after some
    /// bytes were already copied, those bytes are returned and the failure
    /// repeats on the next call.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.size();
        let mut position = self.position();
        let mut copied = 0;

        while copied < buf.len() && position < size {
            let key = self.cache.key_for(position);
            let within = (position - key) as usize;

            let chunk = self.cache.get(key).await.and_then(|chunk| {
                if within < chunk.len() {
                    Ok(chunk)
                } else {
                    Err(Error::RemoteFetchFailed {
                        offset: position,
                        cause: format!(
                            "chunk at {} ended after {} bytes, before the end of the file",
                            key,
                            chunk.len()
                        ),
                    })
                }
            });

            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) if copied > 0 => {
                    warn!("Read at {} stopped after {} bytes: {}", position, copied, e);
                    break;
                }
                Err(e) => return Err(e),
            };

            let n = (chunk.len() - within).min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&chunk[within..within + n]);
            copied += n;
            position += n as u64;
            *self.position.lock() = position;
        }

        Ok(copied)
    }
}
