//! Chunk fetcher
//!
//! Turns "bytes `[offset, offset + limit)` of this document" into one
//! aligned `upload.getFile` call, retrying transient failures and
//! honouring flood waits, then trims the reply to the window asked for.

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::telegram::{
    flood_wait, DcSender, ExponentialBackoff, RemoteLocation, SenderError, MAX_CHUNK_SIZE,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Fetches windows of one remote document through one sender
pub struct ChunkFetcher {
    sender: Arc<dyn DcSender>,
    location: Arc<RemoteLocation>,
    alignment: u64,
    timeout: Duration,
    /// Fresh budget cloned for every request
    backoff: ExponentialBackoff,
}

impl ChunkFetcher {
    /// Create a fetcher for `location` using `sender`
    pub fn new(
        sender: Arc<dyn DcSender>,
        location: Arc<RemoteLocation>,
        config: &StreamConfig,
    ) -> Self {
        ChunkFetcher {
            sender,
            location,
            alignment: config.alignment.max(1),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            backoff: ExponentialBackoff::for_fetch(config),
        }
    }

    /// Document this fetcher reads from
    pub fn location(&self) -> &RemoteLocation {
        &self.location
    }

    /// Fetch up to `limit` bytes starting at `offset`
    ///
    /// The result never extends past the end of the file and may be
    /// shorter than `limit` when the window crosses a 1MB boundary.
    /// An empty result means Telegram had no data at `offset`.
    pub async fn fetch(&self, offset: u64, limit: u64) -> Result<Bytes> {
        let size = self.location.size;
        if offset >= size || limit == 0 {
            return Ok(Bytes::new());
        }

        let limit = limit.min(MAX_CHUNK_SIZE).min(size - offset);
        let (aligned_offset, request_limit) = self.request_window(offset, limit);
        let skip = offset - aligned_offset;

        let bytes = self
            .request(offset, aligned_offset, request_limit as u32)
            .await?;

        if bytes.len() as u64 <= skip {
            return Ok(Bytes::new());
        }

        let end = (skip + limit).min(bytes.len() as u64);
        Ok(Bytes::copy_from_slice(&bytes[skip as usize..end as usize]))
    }

    /// Aligned offset and limit covering `[offset, offset + limit)`
    fn request_window(&self, offset: u64, limit: u64) -> (u64, u64) {
        let aligned_offset = offset - offset % self.alignment;
        let wanted = align_up(offset - aligned_offset + limit, self.alignment);

        // A precise request may not cross a 1MB boundary.
        let boundary = (aligned_offset / MAX_CHUNK_SIZE + 1) * MAX_CHUNK_SIZE;
        let request_limit = wanted.min(boundary - aligned_offset).max(self.alignment);

        (aligned_offset, request_limit)
    }

    async fn request(&self, offset: u64, aligned_offset: u64, limit: u32) -> Result<Vec<u8>> {
        let mut backoff = self.backoff.clone();

        loop {
            let outcome = match timeout(
                self.timeout,
                self.sender.get_file(&self.location, aligned_offset, limit),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(SenderError::Transient(format!(
                    "timed out after {:?}",
                    self.timeout
                ))),
            };

            match outcome {
                Ok(bytes) => {
                    debug!(
                        "Fetched {} bytes at offset {} (limit {}) from DC {}",
                        bytes.len(),
                        aligned_offset,
                        limit,
                        self.sender.dc_id()
                    );
                    return Ok(bytes);
                }
                Err(SenderError::RateLimited { wait_secs }) => {
                    warn!("Flood wait of {}s at offset {}", wait_secs, offset);
                    sleep(flood_wait(wait_secs)).await;
                }
                Err(SenderError::Transient(cause)) => match backoff.next_delay() {
                    Some(delay) => {
                        warn!(
                            "Fetch at offset {} failed (attempt {}), retrying in {:?}: {}",
                            offset,
                            backoff.attempts(),
                            delay,
                            cause
                        );
                        sleep(delay).await;
                    }
                    None => return Err(Error::RemoteFetchFailed { offset, cause }),
                },
                Err(SenderError::Fatal(cause)) => return Err(Error::ProtocolMismatch(cause)),
            }
        }
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}
